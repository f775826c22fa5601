//! Value Trader
//!
//! Buys into retracements and manages the position from its cost basis.
//! Role: Dampens drawdowns, takes profit into rallies.
//!
//! Strategy (reinforced mode):
//! - Flat: buy when price has retraced more than 10% from the 5-tick high
//! - Holding: take profit at +10% / +20%, average down below -10%
//!
//! The legacy price-band mode buys cheap and sells expensive against fixed
//! levels.

use super::MarketView;
use crate::domain::AgentState;
use serde::{Deserialize, Serialize};

/// Configuration for value trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueConfig {
    /// Retracement/PnL rules (true) or fixed price bands (false)
    pub reinforced: bool,
    /// Lookback for the recent high
    pub lookback: usize,
    /// Minimum retracement from the recent high to open a position
    pub entry_drawdown: f64,
    /// Base fraction of cash used to open (noise offset is added)
    pub entry_cash_fraction: f64,
    /// PnL above which half the position is sold
    pub take_profit_full: f64,
    /// PnL above which a quarter of the position is sold
    pub take_profit_partial: f64,
    /// PnL below which the position is averaged down
    pub average_down_below: f64,
    /// Fraction of cash used to average down
    pub average_down_cash_fraction: f64,
    /// Band mode: buy everything affordable below this price
    pub band_low: i64,
    /// Band mode: sell half above this price
    pub band_high: i64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            reinforced: true,
            lookback: 5,
            entry_drawdown: 0.10,
            entry_cash_fraction: 0.10,
            take_profit_full: 0.20,
            take_profit_partial: 0.10,
            average_down_below: -0.10,
            average_down_cash_fraction: 0.10,
            band_low: 80,
            band_high: 100,
        }
    }
}

impl ValueConfig {
    /// Legacy fixed-band behaviour
    pub fn price_band(low: i64, high: i64) -> Self {
        Self {
            reinforced: false,
            band_low: low,
            band_high: high,
            ..Default::default()
        }
    }
}

/// Value trader decision policy
#[derive(Debug, Clone)]
pub struct ValueStrategy {
    config: ValueConfig,
}

impl ValueStrategy {
    pub fn new(config: ValueConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValueConfig {
        &self.config
    }

    pub fn decide(&self, state: &AgentState, view: &MarketView<'_>) -> i64 {
        if view.price <= 0 {
            return 0;
        }
        if self.config.reinforced {
            self.decide_reinforced(state, view)
        } else {
            self.decide_band(state, view.price)
        }
    }

    fn decide_reinforced(&self, state: &AgentState, view: &MarketView<'_>) -> i64 {
        let price = view.price as f64;
        let history = view.history;

        if state.stock == 0 {
            if history.len() < self.config.lookback {
                return 0;
            }
            let Some(&max_price) = history[history.len() - self.config.lookback..].iter().max()
            else {
                return 0;
            };
            if max_price <= 0 {
                return 0;
            }
            let retracement = (max_price as f64 - price) / max_price as f64;
            if retracement > self.config.entry_drawdown {
                let fraction = self.config.entry_cash_fraction + state.noise_offset;
                return (state.cash * fraction / price).floor() as i64;
            }
            return 0;
        }

        if history.len() < 2 {
            return 0;
        }

        let cost_basis = state.average_cost * state.stock as f64;
        if cost_basis <= 0.0 {
            return 0;
        }
        let pnl = (price * state.stock as f64 - cost_basis) / cost_basis;

        if pnl > self.config.take_profit_full {
            -(state.stock / 2)
        } else if pnl > self.config.take_profit_partial {
            -(state.stock / 4)
        } else if pnl < self.config.average_down_below {
            (state.cash * self.config.average_down_cash_fraction / price).floor() as i64
        } else {
            0
        }
    }

    fn decide_band(&self, state: &AgentState, price: i64) -> i64 {
        let p = price as f64;
        if price < self.config.band_low {
            return (state.cash / p).floor() as i64;
        }
        if price > self.config.band_high {
            return -(state.stock / 2);
        }
        if state.noise_offset > 0.5 {
            ((state.cash * 0.1).floor() / p).floor() as i64
        } else {
            0
        }
    }
}

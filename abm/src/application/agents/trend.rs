//! Trend Trader
//!
//! Bets on trend continuation over a short observation window.
//! Role: Amplifies trends, creates feedback loops.
//!
//! Strategy:
//! - Trend above +5%: buy with a noise-scaled slice of cash
//! - Trend below -10% (reinforced): stop-loss sell
//! - Trend below -5%: sell a noise-scaled slice of holdings
//! - Flat: trim a small slice of holdings
//!
//! Every output passes through the agent's emotion gate.

use super::MarketView;
use crate::domain::AgentState;
use crate::domain::emotion::emotion_gate;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for trend trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of prices the trend is measured over
    pub observation_window: usize,
    /// Trend magnitude that triggers buying/selling
    pub threshold: f64,
    /// Enable the stop-loss rung below `-stop_loss`
    pub reinforced: bool,
    pub stop_loss: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            observation_window: 5,
            threshold: 0.05,
            reinforced: true,
            stop_loss: 0.10,
        }
    }
}

/// Trend trader decision policy
#[derive(Debug, Clone)]
pub struct TrendStrategy {
    config: TrendConfig,
}

impl TrendStrategy {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Relative change across the observation window
    pub fn trend(&self, history: &[i64]) -> Option<f64> {
        let window = self.config.observation_window.max(2);
        if history.len() < window {
            return None;
        }
        let recent = &history[history.len() - window..];
        let first = recent[0];
        if first <= 0 {
            return None;
        }
        Some((recent[window - 1] - first) as f64 / first as f64)
    }

    pub fn decide<R: Rng + ?Sized>(
        &self,
        state: &AgentState,
        view: &MarketView<'_>,
        rng: &mut R,
    ) -> i64 {
        if view.price <= 0 {
            return 0;
        }
        let Some(trend) = self.trend(view.history) else {
            return 0;
        };

        let p = emotion_gate(state.emotion, rng);
        let price = view.price as f64;
        let stock = state.stock as f64;
        let threshold = self.config.threshold;

        let raw = if trend > threshold {
            (state.cash * (state.noise_offset / 2.0) / price).floor() as i64
        } else if self.config.reinforced && trend < -self.config.stop_loss {
            -((stock * 0.1 * (1.0 + state.noise_offset)).floor() as i64)
        } else if trend < -threshold {
            -((stock * state.noise_offset).floor() as i64)
        } else {
            -((stock * (state.noise_offset / 5.0)).floor() as i64)
        };

        p * raw
    }
}

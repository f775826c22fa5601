//! Quote Adapter
//!
//! Turns a strategy's signed quantity into a limit order without touching the
//! strategy itself. The spread expresses how eager the agent is to trade:
//!
//! ```text
//! s = base(type) × signal(type) × (1 − 0.4·logistic(emotion)) × (1 + jitter)
//! limit = floor(price × (1 ± s)), at least 1
//! ```
//!
//! - Value: narrows as price deviates favourably from its 5-tick mean
//! - Trend: narrows in the direction of last-tick momentum
//! - Risk: widens with its own estimated volatility

use crate::application::agents::Agent;
use crate::domain::emotion::sigmoid;
use crate::domain::{AgentKind, Quote, QuoteSide};
use serde::{Deserialize, Serialize};

/// Spreads never go below this
pub const MIN_SPREAD: f64 = 0.0005;

/// Base spread by agent type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadTable {
    pub value: f64,
    pub trend: f64,
    pub risk: f64,
    pub consortium: f64,
    /// Any other type (noise)
    pub default: f64,
}

impl Default for SpreadTable {
    fn default() -> Self {
        Self {
            value: 0.015,
            trend: 0.01,
            risk: 0.006,
            consortium: 0.008,
            default: 0.02,
        }
    }
}

impl SpreadTable {
    pub fn base(&self, kind: AgentKind) -> f64 {
        match kind {
            AgentKind::Value => self.value,
            AgentKind::Trend => self.trend,
            AgentKind::Risk => self.risk,
            AgentKind::Consortium => self.consortium,
            AgentKind::Noise => self.default,
        }
    }
}

/// Builds limit-priced quotes from desired quantities
#[derive(Debug, Clone, Default)]
pub struct QuoteAdapter {
    spreads: SpreadTable,
}

impl QuoteAdapter {
    pub fn new(spreads: SpreadTable) -> Self {
        Self { spreads }
    }

    /// Spread for `agent` on `side` at `price` given the clearing history
    pub fn spread(&self, agent: &Agent, side: QuoteSide, price: i64, history: &[i64]) -> f64 {
        let kind = agent.kind();
        let p = price as f64;

        let prev = if history.len() >= 2 {
            history[history.len() - 2] as f64
        } else {
            p
        };
        let momentum = if prev > 0.0 { (p - prev) / prev } else { 0.0 };

        let ma5 = if history.len() >= 5 {
            history[history.len() - 5..].iter().sum::<i64>() as f64 / 5.0
        } else {
            p
        };
        let deviation = if ma5 > 0.0 { (p - ma5) / ma5 } else { 0.0 };

        let mut s = self.spreads.base(kind);
        let is_buy = side == QuoteSide::Buy;
        match kind {
            AgentKind::Value => {
                let favourable = if is_buy { -deviation } else { deviation };
                s *= 1.0 - 0.7 * favourable.max(0.0);
            }
            AgentKind::Trend => {
                let with_trend = if is_buy { momentum } else { -momentum };
                s *= 1.0 - 0.7 * with_trend.max(0.0);
            }
            AgentKind::Risk => {
                let sigma = agent.estimated_volatility().unwrap_or(0.0);
                s *= 1.0 + 2.0 * sigma;
            }
            AgentKind::Noise | AgentKind::Consortium => {}
        }

        // Higher emotion, tighter spread
        s *= 1.0 - 0.4 * sigmoid(agent.state.emotion);
        // Per-agent jitter in [-10%, +10%)
        s *= 1.0 + (agent.state.noise_offset - 0.5) * 0.2;

        s.max(MIN_SPREAD)
    }

    /// Quote for a signed desired quantity
    pub fn quote(&self, agent: &Agent, signed_qty: i64, price: i64, history: &[i64]) -> Quote {
        let side = match signed_qty {
            q if q > 0 => QuoteSide::Buy,
            q if q < 0 => QuoteSide::Sell,
            _ => return Quote::none(price),
        };

        let s = self.spread(agent, side, price, history);
        let raw_limit = match side {
            QuoteSide::Buy => price as f64 * (1.0 + s),
            _ => price as f64 * (1.0 - s),
        };

        Quote {
            side,
            limit_price: (raw_limit.floor() as i64).max(1),
            signed_qty,
        }
    }
}

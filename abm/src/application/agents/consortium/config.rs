//! Consortium Configuration
//!
//! Risk overlays and clipping limits for the composite agent.

use serde::{Deserialize, Serialize};

/// Configuration for a consortium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsortiumConfig {
    /// Cash that must stay uncommitted, as a fraction of net worth
    pub min_cash_ratio: f64,
    /// Largest position value allowed, as a fraction of net worth
    pub max_position_ratio: f64,
    /// Extra member draws (same type) when the chosen member abstains
    pub max_retries: usize,
    /// Last-tick return below which sells are amplified
    pub momentum_threshold: f64,
    /// Sell amplification per unit of negative momentum
    pub momentum_gain: f64,
    /// Cap on sell amplification
    pub max_sell_amplification: f64,
    /// Drawdown from peak below which a defensive sell is forced
    pub drawdown_limit: f64,
    /// Use `logistic(|emotion|)` directly instead of a Bernoulli draw.
    ///
    /// The single agents always draw; the consortium multiplies by the gate
    /// value, so the two readings differ materially.
    pub continuous_gate: bool,
}

impl Default for ConsortiumConfig {
    fn default() -> Self {
        Self {
            min_cash_ratio: 0.05,
            max_position_ratio: 0.8,
            max_retries: 3,
            momentum_threshold: -0.05,
            momentum_gain: 5.0,
            max_sell_amplification: 1.5,
            drawdown_limit: -0.15,
            continuous_gate: false,
        }
    }
}

impl ConsortiumConfig {
    /// Keep more cash and smaller positions
    pub fn conservative() -> Self {
        Self {
            min_cash_ratio: 0.2,
            max_position_ratio: 0.5,
            drawdown_limit: -0.10,
            ..Default::default()
        }
    }

    /// Set max position ratio (builder pattern)
    pub fn with_max_position_ratio(mut self, ratio: f64) -> Self {
        self.max_position_ratio = ratio;
        self
    }

    /// Set min cash ratio (builder pattern)
    pub fn with_min_cash_ratio(mut self, ratio: f64) -> Self {
        self.min_cash_ratio = ratio;
        self
    }

    /// Set gate interpretation (builder pattern)
    pub fn with_continuous_gate(mut self, continuous: bool) -> Self {
        self.continuous_gate = continuous;
        self
    }
}

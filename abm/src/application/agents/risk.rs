//! Risk-Parity Trader
//!
//! Sizes its position so that position weight times estimated volatility
//! tracks a target volatility.
//!
//! Strategy:
//! - EWMA variance of one-tick returns: `var = λ·var + (1-λ)·r²`
//! - Weight `w = clamp(σ*_eff / σ_est · drawdown_adj · noise, w_min, w_max)`
//! - Move towards `floor(w · net_worth / price)` shares, at most `max_step` per tick
//!
//! Emotion raises (positive) or lowers (negative) the effective target.

use super::MarketView;
use crate::domain::AgentState;
use crate::domain::emotion::emotion_gate;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for risk-parity trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParityConfig {
    /// EWMA decay, higher = smoother
    pub lambda: f64,
    /// Target per-step volatility
    pub target_vol: f64,
    /// Weight floor (fraction of net worth)
    pub w_min: f64,
    /// Weight cap (fraction of net worth)
    pub w_max: f64,
    /// Base per-step quantity cap
    pub max_step_qty: i64,
    /// Deltas below this are dropped
    pub min_trade_qty: i64,
    /// Linear coupling of emotion into the target volatility
    pub emotion_k: f64,
}

impl Default for RiskParityConfig {
    fn default() -> Self {
        Self {
            lambda: 0.94,
            target_vol: 0.02,
            w_min: 0.1,
            w_max: 1.5,
            max_step_qty: 50,
            min_trade_qty: 1,
            emotion_k: 0.3,
        }
    }
}

/// Risk-parity decision policy with its own volatility estimate
#[derive(Debug, Clone)]
pub struct RiskParityStrategy {
    config: RiskParityConfig,
    ewma_var: f64,
    peak_value: f64,
}

impl RiskParityStrategy {
    pub fn new(config: RiskParityConfig, initial_value: f64) -> Self {
        Self {
            config,
            ewma_var: 0.0,
            peak_value: initial_value,
        }
    }

    /// Start from a known variance estimate
    pub fn with_variance(mut self, ewma_var: f64) -> Self {
        self.ewma_var = ewma_var.max(0.0);
        self
    }

    pub fn config(&self) -> &RiskParityConfig {
        &self.config
    }

    pub fn ewma_var(&self) -> f64 {
        self.ewma_var
    }

    pub fn estimated_vol(&self) -> f64 {
        self.ewma_var.sqrt()
    }

    pub fn peak_value(&self) -> f64 {
        self.peak_value
    }

    pub fn reset(&mut self, initial_value: f64) {
        self.ewma_var = 0.0;
        self.peak_value = initial_value;
    }

    /// Fold one return into the EWMA variance. The first non-zero
    /// observation seeds the estimate.
    pub fn observe_return(&mut self, r: f64) {
        if self.ewma_var <= 0.0 {
            self.ewma_var = r * r;
        } else {
            let lambda = self.config.lambda;
            self.ewma_var = lambda * self.ewma_var + (1.0 - lambda) * r * r;
        }
    }

    /// Target position weight before any trading constraints
    pub fn target_weight(&self, est_vol: f64, emotion: f64, drawdown: f64, noise_offset: f64) -> f64 {
        let cfg = &self.config;
        let emotion_scale = (1.0 + emotion * cfg.emotion_k).clamp(0.5, 1.5);
        let target_eff = cfg.target_vol * emotion_scale;

        let risk_adj = if drawdown < -0.2 {
            0.5
        } else if drawdown < -0.1 {
            0.7
        } else {
            1.0
        };

        let noise_scale = 0.8 + 0.4 * noise_offset;
        let w_raw = if est_vol > 1e-8 {
            target_eff / est_vol
        } else {
            cfg.w_max
        };
        (w_raw * risk_adj * noise_scale).clamp(cfg.w_min, cfg.w_max)
    }

    /// Per-step quantity cap, widened by noise and emotion magnitude
    pub fn max_step(&self, state: &AgentState) -> i64 {
        let cfg = &self.config;
        let scaled = cfg.max_step_qty as f64
            * (0.5 + state.noise_offset)
            * (0.5 + state.emotion.abs().min(1.0));
        cfg.min_trade_qty.max(scaled.floor() as i64)
    }

    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        state: &AgentState,
        view: &MarketView<'_>,
        rng: &mut R,
    ) -> i64 {
        let history = view.history;
        if history.len() < 2 || view.price <= 0 {
            return 0;
        }
        let prev_price = history[history.len() - 2];
        if prev_price <= 0 {
            return 0;
        }
        let price = view.price as f64;

        let r = (price - prev_price as f64) / prev_price as f64;
        self.observe_return(r);
        let est_vol = self.estimated_vol();

        let value = state.net_worth(price);
        if value > self.peak_value {
            self.peak_value = value;
        }
        let drawdown = if self.peak_value > 0.0 {
            (value - self.peak_value) / self.peak_value
        } else {
            0.0
        };

        let w = self.target_weight(est_vol, state.emotion, drawdown, state.noise_offset);
        let q_target = (w * value / price).floor() as i64;
        let max_step = self.max_step(state);
        let mut delta = (q_target - state.stock).clamp(-max_step, max_step);

        if delta > 0 {
            delta = delta.min(state.affordable(price));
        } else if delta < 0 {
            delta = -(-delta).min(state.stock);
        }

        delta *= emotion_gate(state.emotion, rng);

        if delta.abs() < self.config.min_trade_qty {
            return 0;
        }
        delta
    }
}

//! Noise Trader Agent
//!
//! A random trader that provides baseline volume.
//! Ignores price and history entirely; the size is fixed per agent by its
//! noise offset so individuals differ without re-rolling every tick.

use crate::domain::AgentState;
use crate::domain::emotion::emotion_gate;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for noise trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Probability of a buy each call
    pub buy_probability: f64,
    /// Probability of a sell each call
    pub sell_probability: f64,
    /// Order size is `floor(noise_offset * size_scale) + 1`
    pub size_scale: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            buy_probability: 0.25,
            sell_probability: 0.25,
            size_scale: 10.0,
        }
    }
}

/// Noise trader decision policy
#[derive(Debug, Clone)]
pub struct NoiseStrategy {
    config: NoiseConfig,
}

impl NoiseStrategy {
    pub fn new(config: NoiseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    pub fn order_size(&self, state: &AgentState) -> i64 {
        (state.noise_offset * self.config.size_scale).floor() as i64 + 1
    }

    pub fn decide<R: Rng + ?Sized>(&self, state: &AgentState, rng: &mut R) -> i64 {
        let internal_noise = rng.r#gen::<f64>();

        let raw = if internal_noise > 1.0 - self.config.buy_probability {
            self.order_size(state)
        } else if internal_noise < self.config.sell_probability {
            -self.order_size(state)
        } else {
            return 0;
        };

        emotion_gate(state.emotion, rng) * raw
    }
}

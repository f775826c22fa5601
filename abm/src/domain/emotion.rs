//! Emotion Model
//!
//! Free functions coupling portfolio performance and trading activity back into
//! an agent's scalar emotion. Nothing here knows about agents; callers feed in
//! the numbers and write the result back.
//!
//! - [`independent_update`]: reaction to the agent's own wealth change
//! - [`behavioral_update`]: herd signal from the tick's executed trades
//! - [`collective_organization`]: swarm-style smoothing over the population
//! - [`emotion_gate`]: Bernoulli execution gate derived from |emotion|

use super::Behavior;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Standard logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Saturating range for emotion values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for EmotionBounds {
    fn default() -> Self {
        Self {
            min: -2.0,
            max: 2.0,
        }
    }
}

impl EmotionBounds {
    pub fn clamp(&self, emotion: f64) -> f64 {
        clamp_emotion(emotion, self.min, self.max)
    }
}

/// Clamp emotion into `[min, max]`
pub fn clamp_emotion(emotion: f64, min: f64, max: f64) -> f64 {
    emotion.max(min).min(max)
}

/// Update emotion from the agent's own return over the tick.
///
/// The return is mapped through the logistic curve centred at 0.5, so gains
/// push emotion up and losses push it down by at most 0.5 per call.
pub fn independent_update(prev_value: f64, new_value: f64, emotion: f64) -> f64 {
    if prev_value <= 0.0 {
        return emotion;
    }
    let change = (new_value - prev_value) / prev_value;
    emotion + (sigmoid(change) - 0.5)
}

/// Update emotion from the tick-wide buy/sell balance.
pub fn behavioral_update(behaviors: &[Behavior], emotion: f64) -> f64 {
    let (buys, sells) = behaviors.iter().fold((0u32, 0u32), |(b, s), behavior| match behavior {
        Behavior::Buy => (b + 1, s),
        Behavior::Sell => (b, s + 1),
    });

    let total = buys + sells;
    if total == 0 {
        return emotion;
    }
    emotion + (buys as f64 - sells as f64) / total as f64
}

/// Parameters of the swarm smoothing pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmParams {
    /// Inertia applied to the combined pull
    pub w: f64,
    /// Pull towards the population mean
    pub c1: f64,
    /// Pull towards the leader (largest |emotion|)
    pub c2: f64,
    /// Amplitude of symmetric noise
    pub sigma: f64,
    pub bounds: EmotionBounds,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            w: 1.0,
            c1: 0.2,
            c2: 0.3,
            sigma: 0.05,
            bounds: EmotionBounds::default(),
        }
    }
}

/// One-dimensional particle-swarm pass over all emotions.
///
/// Mean and leader are taken from the input vector before any agent moves.
/// Each agent draws `r1`, `r2` and its noise in that order.
pub fn collective_organization<R: Rng + ?Sized>(
    emotions: &[f64],
    params: &SwarmParams,
    rng: &mut R,
) -> Vec<f64> {
    if emotions.is_empty() {
        return Vec::new();
    }

    let mean = emotions.iter().sum::<f64>() / emotions.len() as f64;
    let leader = emotions
        .iter()
        .copied()
        .reduce(|leader, e| if e.abs() > leader.abs() { e } else { leader })
        .unwrap_or(0.0);

    let unit = Uniform::new(0.0, 1.0);
    emotions
        .iter()
        .map(|&e| {
            let r1 = unit.sample(rng);
            let r2 = unit.sample(rng);
            let noise = (unit.sample(rng) - 0.5) * 2.0 * params.sigma;
            let delta = params.c1 * r1 * (mean - e) + params.c2 * r2 * (leader - e) + noise;
            params.bounds.clamp(e + params.w * delta)
        })
        .collect()
}

/// Probability of acting for a given emotion: `logistic(|emotion|)`.
///
/// Always at least 0.5, so a calm agent still acts about half the time.
pub fn action_probability(emotion: f64) -> f64 {
    sigmoid(emotion.abs())
}

/// Bernoulli execution gate: 1 with probability `logistic(|emotion|)`, else 0.
pub fn emotion_gate<R: Rng + ?Sized>(emotion: f64, rng: &mut R) -> i64 {
    let p = action_probability(emotion);
    if rng.r#gen::<f64>() < p { 1 } else { 0 }
}

//! Engine configuration
//!
//! Every tunable of the market: price formation, circuit breakers, emotion
//! dynamics, tail shocks, the default population and per-strategy parameters.
//! Loadable from JSON; missing fields fall back to the defaults.

use crate::application::agents::{
    ConsortiumConfig, NoiseConfig, RiskParityConfig, TrendConfig, ValueConfig,
};
use crate::application::execution::SpreadTable;
use crate::domain::{AgentKind, EmotionBounds, SwarmParams};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Low-probability end-of-tick price shocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailRiskConfig {
    pub enabled: bool,
    /// Probability of a black swan per tick
    pub black_swan_probability: f64,
    /// Price multiplier of a black swan
    pub black_swan_multiplier: f64,
    /// Probability of a bull run per tick
    pub bull_run_probability: f64,
    /// Bull run multiplier is drawn uniformly from `[min, max]`
    pub bull_run_min_multiplier: f64,
    pub bull_run_max_multiplier: f64,
}

impl Default for TailRiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            black_swan_probability: 0.05,
            black_swan_multiplier: 0.01,
            bull_run_probability: 0.05,
            bull_run_min_multiplier: 1.5,
            bull_run_max_multiplier: 3.0,
        }
    }
}

impl TailRiskConfig {
    /// No shocks at all
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Default roster sizes and starting capital per agent type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub value_count: usize,
    pub trend_count: usize,
    pub noise_count: usize,
    pub risk_count: usize,
    pub value_cash: f64,
    pub trend_cash: f64,
    pub noise_cash: f64,
    pub risk_cash: f64,
    pub consortium_cash: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            value_count: 9,
            trend_count: 9,
            noise_count: 9,
            risk_count: 4,
            value_cash: 1_000.0,
            trend_cash: 10_000.0,
            noise_cash: 10_000.0,
            risk_cash: 5_000.0,
            consortium_cash: 300_000.0,
        }
    }
}

impl PopulationConfig {
    /// Starting cash for an agent of `kind`
    pub fn initial_cash(&self, kind: AgentKind) -> f64 {
        match kind {
            AgentKind::Value => self.value_cash,
            AgentKind::Trend => self.trend_cash,
            AgentKind::Noise => self.noise_cash,
            AgentKind::Risk => self.risk_cash,
            AgentKind::Consortium => self.consortium_cash,
        }
    }
}

/// Parameter blocks handed to each strategy at construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfigs {
    pub value: ValueConfig,
    pub trend: TrendConfig,
    pub noise: NoiseConfig,
    pub risk: RiskParityConfig,
    pub consortium: ConsortiumConfig,
}

/// Configuration for the market engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Random seed for determinism (entropy if absent)
    pub seed: Option<u64>,
    /// Price before the first tick
    pub initial_price: i64,
    /// Band applied during price formation
    pub min_price: i64,
    pub max_price: i64,
    /// `imbalance = (demand - supply) / imbalance_divisor`
    pub imbalance_divisor: f64,
    /// `new = prev * (1 + price_sensitivity * imbalance)`
    pub price_sensitivity: f64,
    /// Largest one-tick fall from price formation, as a fraction of price
    pub max_drop_ratio: f64,
    /// Last-tick move beyond which trades in the move's direction may be blocked
    pub circuit_breaker_threshold: f64,
    /// Chance a trade passes an active circuit breaker
    pub circuit_breaker_pass_probability: f64,
    pub emotion_bounds: EmotionBounds,
    pub swarm: SwarmParams,
    pub tail_risk: TailRiskConfig,
    pub population: PopulationConfig,
    pub spreads: SpreadTable,
    pub strategies: StrategyConfigs,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: Some(42),
            initial_price: 30,
            min_price: 1,
            max_price: 3_000,
            imbalance_divisor: 100.0,
            price_sensitivity: 0.1,
            max_drop_ratio: 0.5,
            circuit_breaker_threshold: 0.5,
            circuit_breaker_pass_probability: 0.5,
            emotion_bounds: EmotionBounds::default(),
            swarm: SwarmParams::default(),
            tail_risk: TailRiskConfig::default(),
            population: PopulationConfig::default(),
            spreads: SpreadTable::default(),
            strategies: StrategyConfigs::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set seed (builder pattern)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set initial price (builder pattern)
    pub fn with_initial_price(mut self, price: i64) -> Self {
        self.initial_price = price;
        self
    }

    /// Set tail shocks (builder pattern)
    pub fn with_tail_risk(mut self, tail_risk: TailRiskConfig) -> Self {
        self.tail_risk = tail_risk;
        self
    }

    /// Set default population (builder pattern)
    pub fn with_population(mut self, population: PopulationConfig) -> Self {
        self.population = population;
        self
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.min_price < 1 {
            return invalid(format!("min_price must be >= 1, got {}", self.min_price));
        }
        if self.max_price < self.min_price {
            return invalid(format!(
                "max_price {} is below min_price {}",
                self.max_price, self.min_price
            ));
        }
        if self.initial_price < self.min_price || self.initial_price > self.max_price {
            return invalid(format!(
                "initial_price {} outside [{}, {}]",
                self.initial_price, self.min_price, self.max_price
            ));
        }
        if self.imbalance_divisor <= 0.0 {
            return invalid("imbalance_divisor must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.max_drop_ratio) {
            return invalid("max_drop_ratio must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.circuit_breaker_pass_probability) {
            return invalid("circuit_breaker_pass_probability must be in [0, 1]".to_string());
        }
        if self.emotion_bounds.min > self.emotion_bounds.max {
            return invalid("emotion_bounds.min exceeds emotion_bounds.max".to_string());
        }
        if self.swarm.bounds.min > self.swarm.bounds.max {
            return invalid("swarm.bounds.min exceeds swarm.bounds.max".to_string());
        }

        let tail = &self.tail_risk;
        let probabilities = tail.black_swan_probability + tail.bull_run_probability;
        if tail.black_swan_probability < 0.0
            || tail.bull_run_probability < 0.0
            || probabilities > 1.0
        {
            return invalid(format!(
                "tail probabilities must be non-negative and sum to <= 1, got {probabilities}"
            ));
        }
        if tail.black_swan_multiplier <= 0.0 {
            return invalid("black_swan_multiplier must be positive".to_string());
        }
        if tail.bull_run_min_multiplier <= 0.0
            || tail.bull_run_max_multiplier < tail.bull_run_min_multiplier
        {
            return invalid("bull run multiplier range is empty or non-positive".to_string());
        }

        let pop = &self.population;
        let cash = [
            pop.value_cash,
            pop.trend_cash,
            pop.noise_cash,
            pop.risk_cash,
            pop.consortium_cash,
        ];
        if cash.iter().any(|c| *c < 0.0 || !c.is_finite()) {
            return invalid("initial cash must be finite and non-negative".to_string());
        }

        let cons = &self.strategies.consortium;
        if !(0.0..=1.0).contains(&cons.min_cash_ratio)
            || !(0.0..=1.0).contains(&cons.max_position_ratio)
        {
            return invalid("consortium ratios must be in [0, 1]".to_string());
        }

        Ok(())
    }
}

//! Simulation Framework
//!
//! Provides the tick loop and configuration for running the emotion-driven
//! single-asset market.
//!
//! # Architecture
//!
//! The engine coordinates:
//! - Roster setup (single-strategy agents and consortiums)
//! - Two rounds of agent decisions per tick around price formation
//! - Quote filtering and settlement at the clearing price
//! - Individual, behavioural and collective emotion updates
//! - Tail shocks and metrics collection

mod config;
mod engine;
mod metrics;

pub use config::{EngineConfig, PopulationConfig, StrategyConfigs, TailRiskConfig};
pub use engine::{MarketEngine, PRESET_CONSORTIUMS};
pub use metrics::{AgentSnapshot, MarketSnapshot, SimulationMetrics, TickReport, price_volatility};

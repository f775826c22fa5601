//! Emotion-driven agent-based market
//!
//! A single-asset market populated by value, trend, noise and risk-parity
//! agents plus consortiums that pool them. Each tick forms one clearing price
//! from aggregate demand and supply, settles quoted orders, and feeds wealth
//! changes and herd behaviour back into every agent's emotion.

pub mod application;
pub mod domain;
pub mod error;

// Re-export key types at crate root
pub use application::agents::{Agent, Consortium, MarketView, Strategy};
pub use application::execution::{QuoteAdapter, SpreadTable};
pub use application::simulation::{
    EngineConfig, MarketEngine, MarketSnapshot, SimulationMetrics, TailRiskConfig, TickReport,
};
pub use domain::{AgentKind, AgentState, Behavior, Quote, QuoteSide, TailEvent, TailEventKind};
pub use error::{ConfigError, EngineError, Result};

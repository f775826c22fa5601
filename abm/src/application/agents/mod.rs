//! Agent Framework
//!
//! Portfolio-holding agents and their decision policies.
//!
//! # Agent Types
//!
//! - **Value**: Buys retracements, takes profit from its cost basis
//! - **Trend**: Bets on trend continuation (amplifies trends)
//! - **Noise**: Random trader providing baseline volume
//! - **Risk**: Risk-parity sizing from an EWMA volatility estimate
//! - **Consortium**: Composite of member strategies sharing one ledger
//!
//! Every policy maps `(price, history[, context])` to a signed quantity and
//! never fails.

mod agent;

pub mod consortium;
pub mod noise;
pub mod risk;
pub mod trend;
pub mod value;

pub use agent::{Agent, DecisionContext, MarketView, Strategy};

pub use consortium::{Consortium, ConsortiumConfig};
pub use noise::{NoiseConfig, NoiseStrategy};
pub use risk::{RiskParityConfig, RiskParityStrategy};
pub use trend::{TrendConfig, TrendStrategy};
pub use value::{ValueConfig, ValueStrategy};

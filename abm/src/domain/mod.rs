//! Domain layer: Pure business logic and value objects

pub mod emotion;
mod market;
mod portfolio;
mod quote;

pub use emotion::{EmotionBounds, SwarmParams};
pub use market::{Behavior, MarketState, TailEvent, TailEventKind, last_return};
pub use portfolio::{AgentId, AgentKind, AgentState};
pub use quote::{Quote, QuoteSide};

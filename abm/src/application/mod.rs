//! Application layer: Use cases and orchestration
//!
//! Contains:
//! - **agents**: Strategy agents and the consortium composite
//! - **execution**: Quote adapter turning quantities into limit orders
//! - **simulation**: MarketEngine that runs the tick loop

pub mod agents;
pub mod execution;
pub mod simulation;

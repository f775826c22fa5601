//! Execution
//!
//! Converts desired quantities into limit-priced quotes.

mod quote_adapter;

pub use quote_adapter::{MIN_SPREAD, QuoteAdapter, SpreadTable};

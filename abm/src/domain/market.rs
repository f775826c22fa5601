//! Market state
//!
//! Process-wide simulation state shared by the engine and read by observers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Executed trade direction, recorded once per settled order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Buy,
    Sell,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Buy => write!(f, "buy"),
            Behavior::Sell => write!(f, "sell"),
        }
    }
}

/// Kind of tail shock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TailEventKind {
    /// Severe downward shock
    BlackSwan,
    /// Sharp upward shock
    BullRun,
}

/// Structured record of a tail shock applied at the end of a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailEvent {
    /// Day the shock hit
    pub tick: u64,
    pub kind: TailEventKind,
    pub multiplier: f64,
    pub price_before: i64,
    pub price_after: i64,
}

/// Price, history and per-tick activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketState {
    /// Current price (integer, >= 1)
    pub price: i64,
    /// Clearing prices, oldest first. Tail shocks move `price` without appending.
    pub price_history: Vec<i64>,
    /// Tick counter
    pub day: u64,
    /// Trades executed during the last tick, in settlement order
    pub behavioral_list: Vec<Behavior>,
}

impl MarketState {
    pub fn new(initial_price: i64) -> Self {
        Self {
            price: initial_price.max(1),
            price_history: Vec::with_capacity(1024),
            day: 0,
            behavioral_list: Vec::new(),
        }
    }

    /// Relative change between the last two clearing prices
    pub fn last_return(&self) -> Option<f64> {
        last_return(&self.price_history)
    }

    /// Last-tick drop larger than `threshold` (e.g. 0.5 = 50%)
    pub fn severe_drop(&self, threshold: f64) -> bool {
        self.last_return().is_some_and(|r| -r > threshold)
    }

    /// Last-tick rise larger than `threshold`
    pub fn severe_rise(&self, threshold: f64) -> bool {
        self.last_return().is_some_and(|r| r > threshold)
    }
}

/// Relative change between the last two entries of a price series
pub fn last_return(history: &[i64]) -> Option<f64> {
    match history {
        [.., prev, last] if *prev > 0 => Some((*last - *prev) as f64 / *prev as f64),
        _ => None,
    }
}

//! Portfolio state shared by every agent variant
//!
//! One concrete record holds identity, ledger and emotion. Strategy-specific
//! state lives in the decision policies, never here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behavior discriminant of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Value,
    Trend,
    Noise,
    Risk,
    Consortium,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Value => "value",
            AgentKind::Trend => "trend",
            AgentKind::Noise => "noise",
            AgentKind::Risk => "risk",
            AgentKind::Consortium => "consortium",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, ledger and emotion of one agent.
///
/// Invariants: `cash >= 0`, `stock >= 0`, `average_cost == 0` when flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub kind: AgentKind,
    pub cash: f64,
    pub stock: i64,
    /// Weighted average entry price of current holdings
    pub average_cost: f64,
    pub emotion: f64,
    /// Fixed at creation, in `[0, 1)`
    pub noise_offset: f64,
    /// Net worth at the start of the current tick
    pub prev_value: f64,
    /// Cash at creation, used by `reset`
    pub initial_cash: f64,
}

impl AgentState {
    pub fn new(id: impl Into<String>, kind: AgentKind, initial_cash: f64, noise_offset: f64) -> Self {
        let initial_cash = initial_cash.max(0.0);
        Self {
            id: AgentId::new(id),
            kind,
            cash: initial_cash,
            stock: 0,
            average_cost: 0.0,
            emotion: 0.0,
            noise_offset: noise_offset.clamp(0.0, 1.0 - f64::EPSILON),
            prev_value: 0.0,
            initial_cash,
        }
    }

    /// `cash + stock * price`
    pub fn net_worth(&self, price: f64) -> f64 {
        self.cash + self.stock as f64 * price
    }

    /// Whole shares affordable at `price`
    pub fn affordable(&self, price: f64) -> i64 {
        if price <= 0.0 {
            return 0;
        }
        (self.cash / price).floor() as i64
    }

    /// Buy `qty` shares at `price`, updating the weighted average cost.
    ///
    /// Returns false (and changes nothing) if the purchase is not affordable.
    pub fn settle_buy(&mut self, qty: i64, price: f64) -> bool {
        let cost = qty as f64 * price;
        if qty <= 0 || price <= 0.0 || self.cash < cost {
            return false;
        }
        let new_qty = self.stock + qty;
        let numerator = self.average_cost * self.stock as f64 + cost;
        self.average_cost = if new_qty > 0 {
            numerator / new_qty as f64
        } else {
            0.0
        };
        self.cash = (self.cash - cost).max(0.0);
        self.stock = new_qty;
        true
    }

    /// Sell `qty` shares at `price`. Partial sells keep the average cost.
    ///
    /// Returns false (and changes nothing) if holdings are insufficient.
    pub fn settle_sell(&mut self, qty: i64, price: f64) -> bool {
        if qty <= 0 || self.stock < qty {
            return false;
        }
        self.cash += qty as f64 * price;
        self.stock -= qty;
        if self.stock == 0 {
            self.average_cost = 0.0;
        }
        true
    }

    /// Overwrite the ledger fields from another state (consortium -> member)
    pub fn mirror_ledger(&mut self, source: &AgentState) {
        self.cash = source.cash;
        self.stock = source.stock;
        self.average_cost = source.average_cost;
        self.prev_value = source.prev_value;
    }

    /// Back to the starting ledger and a neutral emotion
    pub fn reset(&mut self) {
        self.cash = self.initial_cash;
        self.stock = 0;
        self.average_cost = 0.0;
        self.emotion = 0.0;
        self.prev_value = 0.0;
    }
}

//! Tick reports, run metrics and observer snapshots

use crate::application::agents::{Agent, Strategy};
use crate::domain::{AgentKind, Behavior, TailEvent, TailEventKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Day after the tick
    pub day: u64,
    /// Clearing price from price formation
    pub clearing_price: i64,
    /// Price after any tail shock
    pub price: i64,
    /// Sum of positive pre-trade intentions
    pub demand: i64,
    /// Sum of negated negative pre-trade intentions
    pub supply: i64,
    /// Buys settled
    pub buys: usize,
    /// Sells settled
    pub sells: usize,
    /// Shares bought plus shares sold
    pub volume: i64,
    /// Trades vetoed by a circuit breaker
    pub blocked: usize,
    pub tail_event: Option<TailEvent>,
}

/// Simulation metrics aggregated over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Total ticks processed
    pub total_ticks: u64,
    pub total_buys: u64,
    pub total_sells: u64,
    /// Total shares traded
    pub total_volume: i64,
    pub black_swans: u64,
    pub bull_runs: u64,
    /// Mean clearing price
    pub avg_price: f64,
    /// Standard deviation of clearing prices over their mean
    pub price_volatility: f64,
    /// Price after the last tick
    pub final_price: i64,
    /// Net worth at the final price, summed by agent type
    pub wealth_by_type: BTreeMap<AgentKind, f64>,
}

impl SimulationMetrics {
    /// Fold one tick into the running totals
    pub fn record(&mut self, report: &TickReport) {
        self.total_ticks += 1;
        self.total_buys += report.buys as u64;
        self.total_sells += report.sells as u64;
        self.total_volume += report.volume;

        let n = self.total_ticks as f64;
        self.avg_price = (self.avg_price * (n - 1.0) + report.clearing_price as f64) / n;
        self.final_price = report.price;

        if let Some(event) = &report.tail_event {
            match event.kind {
                TailEventKind::BlackSwan => self.black_swans += 1,
                TailEventKind::BullRun => self.bull_runs += 1,
            }
        }
    }

    /// Volatility and wealth breakdown at the end of a run
    pub fn finalize(&mut self, price_history: &[i64], agents: &[Agent], price: i64) {
        self.price_volatility = price_volatility(price_history);
        self.final_price = price;

        self.wealth_by_type.clear();
        for agent in agents {
            *self.wealth_by_type.entry(agent.kind()).or_insert(0.0) +=
                agent.state.net_worth(price as f64);
        }
    }
}

/// Population standard deviation of prices divided by their mean
pub fn price_volatility(prices: &[i64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    let n = prices.len() as f64;
    let mean = prices.iter().map(|&p| p as f64).sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = prices
        .iter()
        .map(|&p| (p as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean
}

/// Observable fields of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub cash: f64,
    pub stock: i64,
    pub emotion: f64,
    pub average_cost: f64,
    /// Member count, for consortiums
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<usize>,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        let members = match agent.strategy() {
            Strategy::Consortium(c) => Some(c.members().len()),
            _ => None,
        };
        Self {
            id: agent.id().to_string(),
            kind: agent.kind(),
            cash: agent.state.cash,
            stock: agent.state.stock,
            emotion: agent.state.emotion,
            average_cost: agent.state.average_cost,
            members,
        }
    }
}

/// Everything an observer may read between ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub day: u64,
    pub price: i64,
    pub price_history: Vec<i64>,
    pub agents: Vec<AgentSnapshot>,
    pub behavioral_list: Vec<Behavior>,
    pub events: Vec<TailEvent>,
}

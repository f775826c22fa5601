//! Agent Record
//!
//! One concrete portfolio record plus a closed set of decision policies.
//! The variant set is fixed, so dispatch is a plain `match` on [`Strategy`].

use super::{
    Consortium, ConsortiumConfig, NoiseConfig, NoiseStrategy, RiskParityConfig,
    RiskParityStrategy, TrendConfig, TrendStrategy, ValueConfig, ValueStrategy,
};
use crate::domain::{AgentId, AgentKind, AgentState};
use rand::Rng;

/// Consortium-level facts handed to the member that decides for it
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionContext {
    pub cash: f64,
    pub stock: i64,
    pub member_count: usize,
    /// Head count per member type
    pub type_weights: Vec<(AgentKind, usize)>,
}

impl DecisionContext {
    /// Fraction of the pool made up of `kind` members
    pub fn share_of(&self, kind: AgentKind) -> f64 {
        if self.member_count == 0 {
            return 0.0;
        }
        let count = self
            .type_weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, count)| *count);
        count as f64 / self.member_count as f64
    }
}

/// Read-only inputs to a decision
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    pub price: i64,
    /// Clearing prices, oldest first
    pub history: &'a [i64],
    /// Present when deciding on behalf of a consortium
    pub context: Option<&'a DecisionContext>,
}

impl<'a> MarketView<'a> {
    pub fn new(price: i64, history: &'a [i64]) -> Self {
        Self {
            price,
            history,
            context: None,
        }
    }
}

/// Decision policy of an agent
#[derive(Debug, Clone)]
pub enum Strategy {
    Value(ValueStrategy),
    Trend(TrendStrategy),
    Noise(NoiseStrategy),
    Risk(RiskParityStrategy),
    Consortium(Consortium),
}

impl Strategy {
    pub fn kind(&self) -> AgentKind {
        match self {
            Strategy::Value(_) => AgentKind::Value,
            Strategy::Trend(_) => AgentKind::Trend,
            Strategy::Noise(_) => AgentKind::Noise,
            Strategy::Risk(_) => AgentKind::Risk,
            Strategy::Consortium(_) => AgentKind::Consortium,
        }
    }
}

/// A market participant: ledger plus policy
#[derive(Debug, Clone)]
pub struct Agent {
    pub state: AgentState,
    strategy: Strategy,
}

impl Agent {
    pub fn new(id: impl Into<String>, initial_cash: f64, noise_offset: f64, strategy: Strategy) -> Self {
        Self {
            state: AgentState::new(id, strategy.kind(), initial_cash, noise_offset),
            strategy,
        }
    }

    pub fn value(id: impl Into<String>, cash: f64, noise_offset: f64, config: ValueConfig) -> Self {
        Self::new(id, cash, noise_offset, Strategy::Value(ValueStrategy::new(config)))
    }

    pub fn trend(id: impl Into<String>, cash: f64, noise_offset: f64, config: TrendConfig) -> Self {
        Self::new(id, cash, noise_offset, Strategy::Trend(TrendStrategy::new(config)))
    }

    pub fn noise(id: impl Into<String>, cash: f64, noise_offset: f64, config: NoiseConfig) -> Self {
        Self::new(id, cash, noise_offset, Strategy::Noise(NoiseStrategy::new(config)))
    }

    pub fn risk(id: impl Into<String>, cash: f64, noise_offset: f64, config: RiskParityConfig) -> Self {
        let strategy = RiskParityStrategy::new(config, cash);
        Self::new(id, cash, noise_offset, Strategy::Risk(strategy))
    }

    pub fn consortium(
        id: impl Into<String>,
        cash: f64,
        noise_offset: f64,
        config: ConsortiumConfig,
    ) -> Self {
        let strategy = Consortium::new(config, cash);
        Self::new(id, cash, noise_offset, Strategy::Consortium(strategy))
    }

    pub fn id(&self) -> &AgentId {
        &self.state.id
    }

    pub fn kind(&self) -> AgentKind {
        self.state.kind
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn as_consortium_mut(&mut self) -> Option<&mut Consortium> {
        match &mut self.strategy {
            Strategy::Consortium(c) => Some(c),
            _ => None,
        }
    }

    /// Estimated per-step volatility, for agents that track one
    pub fn estimated_volatility(&self) -> Option<f64> {
        match &self.strategy {
            Strategy::Risk(r) => Some(r.estimated_vol()),
            _ => None,
        }
    }

    /// Signed desired quantity: positive = buy, negative = sell, 0 = hold.
    ///
    /// Never fails; missing history, empty books or degenerate prices yield 0.
    pub fn decide<R: Rng + ?Sized>(&mut self, view: &MarketView<'_>, rng: &mut R) -> i64 {
        if let Some(ctx) = view.context {
            log::trace!(
                "[{}] deciding for a {}-member pool ({:.0}% {}) holding {:.2} cash and {} shares",
                self.state.id,
                ctx.member_count,
                ctx.share_of(self.kind()) * 100.0,
                self.kind(),
                ctx.cash,
                ctx.stock
            );
        }
        match &mut self.strategy {
            Strategy::Value(s) => s.decide(&self.state, view),
            Strategy::Trend(s) => s.decide(&self.state, view, rng),
            Strategy::Noise(s) => s.decide(&self.state, rng),
            Strategy::Risk(s) => s.decide(&self.state, view, rng),
            Strategy::Consortium(c) => c.decide(&self.state, view, rng),
        }
    }

    /// Restore the starting ledger and any policy state
    pub fn reset(&mut self) {
        self.state.reset();
        let initial = self.state.initial_cash;
        match &mut self.strategy {
            Strategy::Risk(r) => r.reset(initial),
            Strategy::Consortium(c) => c.reset(initial),
            _ => {}
        }
    }
}

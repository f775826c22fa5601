//! Market Engine
//!
//! The tick loop that coordinates agents and the single clearing price.
//!
//! One call to [`MarketEngine::step`] runs, in order:
//!
//! 1. Snapshot every agent's net worth into `prev_value`
//! 2. Collect pre-trade intentions at the current price (demand and supply)
//! 3. Form a new clearing price from the imbalance, append it, advance the day
//! 4. Re-query every agent at the new price
//! 5. Quote, filter and settle each order at the clearing price
//! 6. Update each agent's emotion right after its own settlement
//! 7. Run one collective emotion pass over the whole population
//! 8. Maybe apply a tail shock to the price
//!
//! Intentions are queried twice per tick on purpose: the second query sees the
//! price the first one produced.

use super::config::EngineConfig;
use super::metrics::{AgentSnapshot, MarketSnapshot, SimulationMetrics, TickReport};
use crate::application::agents::{Agent, MarketView};
use crate::application::execution::QuoteAdapter;
use crate::domain::emotion::{behavioral_update, collective_organization, independent_update};
use crate::domain::{AgentKind, Behavior, MarketState, QuoteSide, TailEvent, TailEventKind};
use crate::error::{EngineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

/// Names and member mixes `(value, trend, risk, noise)` of the preset consortiums
pub const PRESET_CONSORTIUMS: [(&str, usize, usize, usize, usize); 2] =
    [("ValueAboveAll", 9, 4, 4, 1), ("RiskAboveAll", 4, 4, 9, 1)];

/// Single-asset market driven by a fixed roster of agents
pub struct MarketEngine<R: Rng = StdRng> {
    config: EngineConfig,
    market: MarketState,
    agents: Vec<Agent>,
    events: Vec<TailEvent>,
    quotes: QuoteAdapter,
    metrics: SimulationMetrics,
    rng: R,
}

impl MarketEngine<StdRng> {
    /// Create an engine seeded from `config.seed` (entropy if absent)
    pub fn new(config: EngineConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Restart the random stream from `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

impl<R: Rng> MarketEngine<R> {
    /// Create an engine drawing all randomness from `rng`
    pub fn with_rng(config: EngineConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let quotes = QuoteAdapter::new(config.spreads.clone());
        Ok(Self {
            market: MarketState::new(config.initial_price),
            agents: Vec::new(),
            events: Vec::new(),
            quotes,
            metrics: SimulationMetrics::default(),
            config,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn price(&self) -> i64 {
        self.market.price
    }

    pub fn price_history(&self) -> &[i64] {
        &self.market.price_history
    }

    pub fn day(&self) -> u64 {
        self.market.day
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Trades settled during the last tick, in settlement order
    pub fn behavioral_list(&self) -> &[Behavior] {
        &self.market.behavioral_list
    }

    /// Tail shocks applied so far
    pub fn events(&self) -> &[TailEvent] {
        &self.events
    }

    /// Running totals since construction or the last reset
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Add a prepared agent. Only allowed before the first step.
    pub fn add_agent(&mut self, agent: Agent) -> Result<()> {
        self.ensure_open()?;
        self.ensure_unique(&agent.id().0)?;
        self.agents.push(agent);
        Ok(())
    }

    /// Add `count` agents of each single-strategy type, interleaved per index.
    ///
    /// Ids are `{Type}Agent{n}` with `n` the lowest index not yet taken.
    pub fn init_agents(&mut self, count: usize) -> Result<()> {
        self.ensure_open()?;
        for _ in 0..count {
            for kind in [AgentKind::Value, AgentKind::Trend, AgentKind::Noise, AgentKind::Risk] {
                let cash = self.config.population.initial_cash(kind);
                let id = self.next_id(&format!("{}Agent", type_label(kind)));
                let agent = self.spawn(kind, id, cash);
                self.agents.push(agent);
            }
        }
        log::info!("Initialised {} agents of each type", count);
        Ok(())
    }

    /// Add the configured default population, grouped by type
    pub fn init_default_agents(&mut self) -> Result<()> {
        self.ensure_open()?;
        let pop = self.config.population.clone();
        let groups = [
            (AgentKind::Value, pop.value_count),
            (AgentKind::Trend, pop.trend_count),
            (AgentKind::Noise, pop.noise_count),
            (AgentKind::Risk, pop.risk_count),
        ];
        for (kind, count) in groups {
            for _ in 0..count {
                let cash = self.config.population.initial_cash(kind);
                let id = self.next_id(&format!("{}Agent", type_label(kind)));
                let agent = self.spawn(kind, id, cash);
                self.agents.push(agent);
            }
        }
        log::info!(
            "Initialised default roster: {} value, {} trend, {} noise, {} risk",
            pop.value_count,
            pop.trend_count,
            pop.noise_count,
            pop.risk_count
        );
        Ok(())
    }

    /// Add one consortium with a fixed member mix. `name` must not be taken.
    pub fn init_consortium(
        &mut self,
        name: &str,
        value_count: usize,
        trend_count: usize,
        risk_count: usize,
        noise_count: usize,
    ) -> Result<()> {
        self.ensure_open()?;
        if value_count + trend_count + risk_count + noise_count == 0 {
            return Err(EngineError::EmptyConsortium(name.to_string()));
        }
        self.ensure_unique(name)?;

        let cash = self.config.population.consortium_cash;
        let mut agent = self.spawn(AgentKind::Consortium, name.to_string(), cash);

        let mix = [
            (AgentKind::Value, value_count),
            (AgentKind::Trend, trend_count),
            (AgentKind::Risk, risk_count),
            (AgentKind::Noise, noise_count),
        ];
        let mut members = Vec::new();
        for (kind, count) in mix {
            for k in 0..count {
                members.push(self.spawn(kind, format!("{}-{}{}", name, type_tag(kind), k), cash));
            }
        }
        if let Some(pool) = agent.as_consortium_mut() {
            for member in members {
                pool.add_member(member);
            }
        }
        self.agents.push(agent);
        log::info!(
            "Consortium {} initialised: {} value, {} trend, {} risk, {} noise",
            name,
            value_count,
            trend_count,
            risk_count,
            noise_count
        );
        Ok(())
    }

    /// Add `count` consortiums with randomised member mixes
    pub fn init_consortiums(&mut self, count: usize) -> Result<()> {
        self.ensure_open()?;
        for _ in 0..count {
            let value = self.rng.gen_range(5..=8);
            let trend = self.rng.gen_range(1..=4);
            let risk = self.rng.gen_range(3..=6);
            let noise = self.rng.gen_range(1..=2);
            let name = self.next_id("Consortium");
            self.init_consortium(&name, value, trend, risk, noise)?;
        }
        Ok(())
    }

    /// Add the value-heavy and risk-heavy preset consortiums
    pub fn init_preset_consortiums(&mut self) -> Result<()> {
        for (name, value, trend, risk, noise) in PRESET_CONSORTIUMS {
            self.init_consortium(name, value, trend, risk, noise)?;
        }
        Ok(())
    }

    /// Advance the market by one tick
    pub fn step(&mut self) -> Result<TickReport> {
        if self.agents.is_empty() {
            return Err(EngineError::NoAgents);
        }

        let prev_price = self.market.price;
        self.market.behavioral_list.clear();

        // 1-2. Pre-trade intentions
        let mut demand = 0i64;
        let mut supply = 0i64;
        for agent in &mut self.agents {
            agent.state.prev_value = agent.state.net_worth(prev_price as f64);
            let view = MarketView::new(prev_price, &self.market.price_history);
            let qty = agent.decide(&view, &mut self.rng);
            if qty > 0 {
                demand += qty;
            } else if qty < 0 {
                supply -= qty;
            }
        }

        // 3. Price formation
        let clearing = self.clearing_price(prev_price, demand, supply);
        self.market.price = clearing;
        self.market.price_history.push(clearing);
        self.market.day += 1;

        let threshold = self.config.circuit_breaker_threshold;
        let severe_drop = self.market.severe_drop(threshold);
        let severe_rise = self.market.severe_rise(threshold);
        let pass_probability = self.config.circuit_breaker_pass_probability;
        let bounds = self.config.emotion_bounds;

        // 4-6. Re-query, settle, update emotions
        let mut volume = 0i64;
        let mut blocked = 0usize;
        for agent in &mut self.agents {
            let view = MarketView::new(clearing, &self.market.price_history);
            let qty = agent.decide(&view, &mut self.rng);
            let quote = self
                .quotes
                .quote(agent, qty, clearing, &self.market.price_history);
            let size = quote.quantity();
            let price = clearing as f64;

            match quote.side {
                QuoteSide::Buy if agent.state.cash >= price * size as f64 => {
                    let crosses = quote.crosses(clearing);
                    let halted = breaker_blocks(severe_rise, pass_probability, &mut self.rng);
                    if crosses && halted {
                        blocked += 1;
                        log::warn!("[{}] buy of {} blocked by circuit breaker", agent.id(), size);
                    } else if crosses && !halted && agent.state.settle_buy(size, price) {
                        volume += size;
                        self.market.behavioral_list.push(Behavior::Buy);
                        log::trace!("[{}] bought {} @ {}", agent.id(), size, clearing);
                    }
                }
                QuoteSide::Sell if agent.state.stock >= size => {
                    let crosses = quote.crosses(clearing);
                    let halted = breaker_blocks(severe_drop, pass_probability, &mut self.rng);
                    if crosses && halted {
                        blocked += 1;
                        log::warn!("[{}] sell of {} blocked by circuit breaker", agent.id(), size);
                    } else if crosses && !halted && agent.state.settle_sell(size, price) {
                        volume += size;
                        self.market.behavioral_list.push(Behavior::Sell);
                        log::trace!("[{}] sold {} @ {}", agent.id(), size, clearing);
                    }
                }
                _ => {}
            }

            let new_value = agent.state.net_worth(price);
            let emotion = independent_update(agent.state.prev_value, new_value, agent.state.emotion);
            let emotion = bounds.clamp(emotion);
            let emotion = behavioral_update(&self.market.behavioral_list, emotion);
            agent.state.emotion = bounds.clamp(emotion);
        }

        // 7. Collective organisation
        let emotions: Vec<f64> = self.agents.iter().map(|a| a.state.emotion).collect();
        let organised = collective_organization(&emotions, &self.config.swarm, &mut self.rng);
        for (agent, emotion) in self.agents.iter_mut().zip(organised) {
            agent.state.emotion = bounds.clamp(emotion);
        }

        // 8. Tail shock
        let tail_event = self.apply_tail_shock();

        let buys = self.count_behavior(Behavior::Buy);
        let sells = self.market.behavioral_list.len() - buys;
        let report = TickReport {
            day: self.market.day,
            clearing_price: clearing,
            price: self.market.price,
            demand,
            supply,
            buys,
            sells,
            volume,
            blocked,
            tail_event,
        };
        self.metrics.record(&report);

        log::debug!(
            "Day {}: price {} -> {}, demand={}, supply={}, buys={}, sells={}",
            report.day,
            prev_price,
            report.price,
            demand,
            supply,
            buys,
            sells
        );

        Ok(report)
    }

    /// Run `ticks` steps and return the metrics accumulated so far
    pub fn run(&mut self, ticks: u64) -> Result<SimulationMetrics> {
        if self.agents.is_empty() {
            return Err(EngineError::NoAgents);
        }
        for _ in 0..ticks {
            self.step()?;
        }

        self.metrics
            .finalize(&self.market.price_history, &self.agents, self.market.price);
        log::info!(
            "Run finished at day {}: price={}, buys={}, sells={}, black swans={}, bull runs={}",
            self.market.day,
            self.market.price,
            self.metrics.total_buys,
            self.metrics.total_sells,
            self.metrics.black_swans,
            self.metrics.bull_runs
        );
        Ok(self.metrics.clone())
    }

    /// Observable state for presentation
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            day: self.market.day,
            price: self.market.price,
            price_history: self.market.price_history.clone(),
            agents: self.agents.iter().map(AgentSnapshot::from).collect(),
            behavioral_list: self.market.behavioral_list.clone(),
            events: self.events.clone(),
        }
    }

    /// Back to day 0 with every agent's starting ledger; the roster is kept.
    ///
    /// The random stream continues where it left off.
    pub fn reset(&mut self) {
        self.market = MarketState::new(self.config.initial_price);
        self.events.clear();
        self.metrics = SimulationMetrics::default();
        for agent in &mut self.agents {
            agent.reset();
        }
    }

    /// Candidate price from the demand/supply imbalance.
    ///
    /// Falls by at most `max_drop_ratio` and stays inside the configured band.
    pub fn clearing_price(&self, prev_price: i64, demand: i64, supply: i64) -> i64 {
        let imbalance = (demand - supply) as f64 / self.config.imbalance_divisor;
        let prev = prev_price as f64;
        let floor = prev * (1.0 - self.config.max_drop_ratio);
        let candidate = (prev * (1.0 + imbalance * self.config.price_sensitivity)).max(floor);
        candidate
            .clamp(self.config.min_price as f64, self.config.max_price as f64)
            .floor() as i64
    }

    fn apply_tail_shock(&mut self) -> Option<TailEvent> {
        let tail = &self.config.tail_risk;
        if !tail.enabled {
            return None;
        }

        let u = self.rng.r#gen::<f64>();
        let (kind, multiplier) = if u < tail.black_swan_probability {
            (TailEventKind::BlackSwan, tail.black_swan_multiplier)
        } else if u > 1.0 - tail.bull_run_probability {
            let range = Uniform::new_inclusive(tail.bull_run_min_multiplier, tail.bull_run_max_multiplier);
            (TailEventKind::BullRun, range.sample(&mut self.rng))
        } else {
            return None;
        };

        let price_before = self.market.price;
        let price_after = ((price_before as f64 * multiplier).floor() as i64).max(1);
        self.market.price = price_after;

        let event = TailEvent {
            tick: self.market.day,
            kind,
            multiplier,
            price_before,
            price_after,
        };
        log::warn!(
            "Day {}: {:?} x{:.2}, price {} -> {}",
            event.tick,
            kind,
            multiplier,
            price_before,
            price_after
        );
        self.events.push(event);
        Some(event)
    }

    fn count_behavior(&self, behavior: Behavior) -> usize {
        self.market
            .behavioral_list
            .iter()
            .filter(|b| **b == behavior)
            .count()
    }

    fn spawn(&mut self, kind: AgentKind, id: String, cash: f64) -> Agent {
        let noise_offset = self.rng.r#gen::<f64>();
        let strategies = &self.config.strategies;
        match kind {
            AgentKind::Value => Agent::value(id, cash, noise_offset, strategies.value.clone()),
            AgentKind::Trend => Agent::trend(id, cash, noise_offset, strategies.trend.clone()),
            AgentKind::Noise => Agent::noise(id, cash, noise_offset, strategies.noise.clone()),
            AgentKind::Risk => Agent::risk(id, cash, noise_offset, strategies.risk.clone()),
            AgentKind::Consortium => {
                Agent::consortium(id, cash, noise_offset, strategies.consortium.clone())
            }
        }
    }

    fn is_registered(&self, id: &str) -> bool {
        self.agents.iter().any(|agent| agent.id().0 == id)
    }

    fn ensure_unique(&self, id: &str) -> Result<()> {
        if self.is_registered(id) {
            return Err(EngineError::DuplicateAgentId(id.to_string()));
        }
        Ok(())
    }

    /// `{prefix}{n}` for the lowest `n` not yet registered
    fn next_id(&self, prefix: &str) -> String {
        let mut n = 0usize;
        loop {
            let id = format!("{prefix}{n}");
            if !self.is_registered(&id) {
                return id;
            }
            n += 1;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.market.day > 0 {
            return Err(EngineError::RosterSealed {
                day: self.market.day,
            });
        }
        Ok(())
    }
}

/// An active breaker lets a trade through with `pass_probability`
fn breaker_blocks<R: Rng + ?Sized>(active: bool, pass_probability: f64, rng: &mut R) -> bool {
    active && rng.r#gen::<f64>() >= pass_probability
}

fn type_label(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Value => "Value",
        AgentKind::Trend => "Trend",
        AgentKind::Noise => "Noise",
        AgentKind::Risk => "Risk",
        AgentKind::Consortium => "Consortium",
    }
}

fn type_tag(kind: AgentKind) -> &'static str {
    &type_label(kind)[..1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::{NoiseConfig, Strategy, ValueConfig};
    use crate::application::simulation::config::{PopulationConfig, TailRiskConfig};
    use crate::domain::SwarmParams;
    use approx::assert_relative_eq;
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    fn quiet_config(seed: u64) -> EngineConfig {
        EngineConfig::default()
            .with_seed(seed)
            .with_tail_risk(TailRiskConfig::disabled())
    }

    fn populated(config: EngineConfig) -> MarketEngine {
        let mut engine = MarketEngine::new(config).unwrap();
        engine.init_default_agents().unwrap();
        engine.init_preset_consortiums().unwrap();
        engine
    }

    fn unique_ids<R: Rng>(engine: &MarketEngine<R>) -> usize {
        engine
            .agents()
            .iter()
            .map(|a| a.id().to_string())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Steep price response and a breaker that never lets a trade through
    fn breaker_config() -> EngineConfig {
        EngineConfig {
            price_sensitivity: 10.0,
            max_price: 1_000_000,
            max_drop_ratio: 0.9,
            circuit_breaker_pass_probability: 0.0,
            ..quiet_config(17)
        }
    }

    #[test]
    fn test_step_without_agents_fails() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        assert!(matches!(engine.step(), Err(EngineError::NoAgents)));
        assert!(matches!(engine.run(10), Err(EngineError::NoAgents)));
        assert_eq!(engine.day(), 0);
        assert!(engine.price_history().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            imbalance_divisor: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            MarketEngine::new(config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_init_agents_interleaves_types() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        engine.init_agents(2).unwrap();

        let ids: Vec<String> = engine.agents().iter().map(|a| a.id().to_string()).collect();
        assert_eq!(
            ids,
            [
                "ValueAgent0", "TrendAgent0", "NoiseAgent0", "RiskAgent0",
                "ValueAgent1", "TrendAgent1", "NoiseAgent1", "RiskAgent1",
            ]
        );
        assert_eq!(engine.agents()[0].state.cash, 1_000.0);
        assert_eq!(engine.agents()[3].state.cash, 5_000.0);
        for agent in engine.agents() {
            assert!((0.0..1.0).contains(&agent.state.noise_offset));
        }
    }

    #[test]
    fn test_default_roster_and_presets() {
        let engine = populated(EngineConfig::default());
        assert_eq!(engine.agents().len(), 9 + 9 + 9 + 4 + 2);

        let value_above_all = &engine.agents()[31];
        assert_eq!(value_above_all.id().to_string(), "ValueAboveAll");
        assert_eq!(value_above_all.state.cash, 300_000.0);
        match value_above_all.strategy() {
            Strategy::Consortium(pool) => {
                assert_eq!(pool.members().len(), 18);
                assert_eq!(
                    pool.type_weights(),
                    vec![
                        (AgentKind::Value, 9),
                        (AgentKind::Trend, 4),
                        (AgentKind::Risk, 4),
                        (AgentKind::Noise, 1),
                    ]
                );
            }
            other => panic!("expected consortium, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_random_consortium_mixes_in_range() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        engine.init_consortiums(5).unwrap();
        assert_eq!(engine.agents().len(), 5);

        for agent in engine.agents() {
            let Strategy::Consortium(pool) = agent.strategy() else {
                panic!("expected consortium");
            };
            for (kind, count) in pool.type_weights() {
                let range = match kind {
                    AgentKind::Value => 5..=8,
                    AgentKind::Trend => 1..=4,
                    AgentKind::Risk => 3..=6,
                    AgentKind::Noise => 1..=2,
                    AgentKind::Consortium => 0..=0,
                };
                assert!(range.contains(&count), "{kind} count {count}");
            }
        }
    }

    #[test]
    fn test_empty_consortium_rejected() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        let err = engine.init_consortium("Hollow", 0, 0, 0, 0).unwrap_err();
        assert!(matches!(err, EngineError::EmptyConsortium(name) if name == "Hollow"));
        assert!(engine.agents().is_empty());
    }

    #[test]
    fn test_roster_sealed_after_first_step() {
        let mut engine = MarketEngine::new(quiet_config(1)).unwrap();
        engine.init_agents(1).unwrap();
        engine.step().unwrap();

        assert!(matches!(
            engine.init_agents(1),
            Err(EngineError::RosterSealed { day: 1 })
        ));
        assert!(engine.init_consortium("Late", 1, 0, 0, 0).is_err());
        assert_eq!(engine.agents().len(), 4);
    }

    #[test]
    fn test_clearing_price_formation() {
        let engine = MarketEngine::new(EngineConfig::default()).unwrap();
        // imbalance 1.0 -> +10%
        assert_eq!(engine.clearing_price(30, 100, 0), 33);
        // no imbalance
        assert_eq!(engine.clearing_price(30, 50, 50), 30);
        // -10% floors to an integer
        assert_eq!(engine.clearing_price(35, 0, 100), 31);
        // capped at a 50% fall
        assert_eq!(engine.clearing_price(30, 0, 10_000), 15);
        // upper band
        assert_eq!(engine.clearing_price(2_900, 1_000, 0), 3_000);
        // lower band
        assert_eq!(engine.clearing_price(1, 0, 1_000), 1);
    }

    #[test]
    fn test_step_advances_day_and_history() {
        let mut engine = populated(quiet_config(42));
        for day in 1..=20 {
            let report = engine.step().unwrap();
            assert_eq!(report.day, day);
            assert_eq!(engine.day(), day);
            assert_eq!(engine.price_history().len(), day as usize);
            assert_eq!(report.price, engine.price());
            assert_eq!(report.buys + report.sells, engine.behavioral_list().len());
            assert!(report.tail_event.is_none());
        }
    }

    #[test]
    fn test_agent_invariants_hold() {
        let mut engine = populated(EngineConfig::default().with_seed(11));
        let bounds = engine.config().emotion_bounds;
        for _ in 0..100 {
            engine.step().unwrap();
            assert!(engine.price() >= 1);
            for agent in engine.agents() {
                let s = &agent.state;
                assert!(s.cash >= 0.0, "{} cash {}", s.id, s.cash);
                assert!(s.stock >= 0, "{} stock {}", s.id, s.stock);
                assert!(s.emotion >= bounds.min && s.emotion <= bounds.max);
                if s.stock == 0 {
                    assert_eq!(s.average_cost, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_black_swan_recorded() {
        let config = EngineConfig::default().with_seed(5).with_tail_risk(TailRiskConfig {
            black_swan_probability: 1.0,
            bull_run_probability: 0.0,
            ..Default::default()
        });
        let mut engine = MarketEngine::new(config).unwrap();
        engine.init_agents(1).unwrap();

        let report = engine.step().unwrap();
        let event = report.tail_event.unwrap();
        assert_eq!(event.kind, TailEventKind::BlackSwan);
        assert_eq!(event.tick, 1);
        assert_eq!(event.price_before, report.clearing_price);
        assert_eq!(
            event.price_after,
            ((report.clearing_price as f64 * 0.01).floor() as i64).max(1)
        );
        assert_eq!(engine.price(), event.price_after);
        assert_eq!(engine.events(), &[event]);
        // shocked price is not a clearing price
        assert_eq!(engine.price_history(), &[report.clearing_price]);
    }

    #[test]
    fn test_bull_run_multiplier_in_range() {
        let config = EngineConfig::default().with_seed(9).with_tail_risk(TailRiskConfig {
            black_swan_probability: 0.0,
            bull_run_probability: 1.0,
            ..Default::default()
        });
        let mut engine = MarketEngine::new(config).unwrap();
        engine.init_agents(1).unwrap();

        for _ in 0..5 {
            let event = engine.step().unwrap().tail_event.unwrap();
            assert_eq!(event.kind, TailEventKind::BullRun);
            assert!((1.5..=3.0).contains(&event.multiplier));
            assert!(event.price_after >= event.price_before);
        }
        assert_eq!(engine.metrics().bull_runs, 5);
    }

    #[test]
    fn test_deterministic() {
        let mut first = populated(EngineConfig::default().with_seed(999));
        let mut second = populated(EngineConfig::default().with_seed(999));

        let metrics1 = first.run(60).unwrap();
        let metrics2 = second.run(60).unwrap();

        assert_eq!(first.price_history(), second.price_history());
        assert_eq!(first.snapshot(), second.snapshot());
        assert_eq!(metrics1, metrics2);
    }

    #[test]
    fn test_run_metrics() {
        let mut engine = populated(quiet_config(3));
        let metrics = engine.run(50).unwrap();

        assert_eq!(metrics.total_ticks, 50);
        assert_eq!(metrics.final_price, engine.price());
        assert!(metrics.avg_price >= 1.0);
        assert_eq!(metrics.black_swans + metrics.bull_runs, 0);
        assert!(metrics.wealth_by_type.contains_key(&AgentKind::Consortium));
        assert_eq!(metrics.wealth_by_type.len(), 5);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut engine = populated(quiet_config(8));
        engine.run(5).unwrap();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.day, 5);
        assert_eq!(snapshot.price, engine.price());
        assert_eq!(snapshot.price_history, engine.price_history());
        assert_eq!(snapshot.agents.len(), engine.agents().len());
        assert_eq!(snapshot.agents[31].members, Some(18));
        assert_eq!(snapshot.behavioral_list, engine.behavioral_list());
    }

    #[test]
    fn test_reset() {
        let mut engine = populated(quiet_config(42));
        engine.run(30).unwrap();
        assert_eq!(engine.day(), 30);

        engine.reset();
        assert_eq!(engine.day(), 0);
        assert_eq!(engine.price(), 30);
        assert!(engine.price_history().is_empty());
        assert!(engine.events().is_empty());
        assert_eq!(engine.metrics().total_ticks, 0);
        for agent in engine.agents() {
            assert_eq!(agent.state.cash, agent.state.initial_cash);
            assert_eq!(agent.state.stock, 0);
        }

        // Roster can be extended again before the next step, with fresh ids
        engine.init_agents(1).unwrap();
        assert_eq!(engine.agents().len(), 33 + 4);
        assert_eq!(unique_ids(&engine), engine.agents().len());
        assert_eq!(engine.agents()[33].id().to_string(), "ValueAgent9");
        assert_eq!(engine.agents()[36].id().to_string(), "RiskAgent4");
    }

    #[test]
    fn test_reseed_replays_after_reset() {
        let mut engine = populated(quiet_config(42));
        engine.run(20).unwrap();

        engine.reset();
        engine.reseed(5);
        let first = engine.run(20).unwrap();
        let first_snapshot = engine.snapshot();

        engine.reset();
        engine.reseed(5);
        let second = engine.run(20).unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.snapshot(), first_snapshot);
    }

    #[test]
    fn test_mixed_setup_calls_keep_ids_unique() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        engine.init_default_agents().unwrap();
        engine.init_agents(1).unwrap();
        engine.init_consortiums(1).unwrap();
        engine.init_consortiums(1).unwrap();

        assert_eq!(engine.agents().len(), 37);
        assert_eq!(unique_ids(&engine), 37);
        assert_eq!(engine.agents()[35].id().to_string(), "Consortium0");
        assert_eq!(engine.agents()[36].id().to_string(), "Consortium1");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut engine = populated(EngineConfig::default());
        let before = engine.agents().len();

        let err = engine.init_consortium("ValueAboveAll", 1, 0, 0, 0).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAgentId(id) if id == "ValueAboveAll"));

        let clash = Agent::noise("NoiseAgent3", 10_000.0, 0.5, NoiseConfig::default());
        let err = engine.add_agent(clash).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAgentId(id) if id == "NoiseAgent3"));

        assert_eq!(engine.agents().len(), before);
        engine
            .add_agent(Agent::noise("Outsider", 10_000.0, 0.5, NoiseConfig::default()))
            .unwrap();
        assert_eq!(unique_ids(&engine), before + 1);
    }

    #[test]
    fn test_consortium_agent_matches_mix() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        engine.init_consortium("Trio", 1, 1, 1, 0).unwrap();

        let agent = &engine.agents()[0];
        assert_eq!(agent.kind(), AgentKind::Consortium);
        assert_eq!(agent.state.cash, 300_000.0);
        let Strategy::Consortium(pool) = agent.strategy() else {
            panic!("expected consortium");
        };
        let ids: Vec<String> = pool.members().iter().map(|m| m.id().to_string()).collect();
        assert_eq!(ids, ["Trio-V0", "Trio-T0", "Trio-R0"]);
        assert!(pool.members().iter().all(|m| m.state.cash == 300_000.0));
    }

    #[test]
    fn test_breaker_blocks_only_when_active() {
        let mut rng = StepRng::new(0, 0);
        assert!(!breaker_blocks(false, 0.0, &mut rng));
        assert!(breaker_blocks(true, 0.0, &mut rng));
        assert!(!breaker_blocks(true, 0.5, &mut rng));
    }

    #[test]
    fn test_breaker_halts_buys_after_severe_rise() {
        let mut config = breaker_config().with_population(PopulationConfig {
            value_count: 0,
            trend_count: 0,
            noise_count: 30,
            risk_count: 0,
            noise_cash: 1e9,
            ..Default::default()
        });
        config.strategies.noise = NoiseConfig {
            buy_probability: 1.0,
            sell_probability: 0.0,
            ..Default::default()
        };
        let mut engine = MarketEngine::new(config).unwrap();
        engine.init_default_agents().unwrap();
        assert_eq!(engine.agents().len(), 30);

        // One clearing price: nothing to compare against yet
        let first = engine.step().unwrap();
        assert!(first.buys > 0);
        assert_eq!(first.blocked, 0);

        let second = engine.step().unwrap();
        assert!(second.clearing_price as f64 > 1.5 * first.clearing_price as f64);
        assert!(second.blocked > 0);
        assert_eq!(second.buys, 0);
        assert_eq!(second.volume, 0);
        assert!(!engine.behavioral_list().contains(&Behavior::Buy));
    }

    #[test]
    fn test_breaker_halts_sells_after_severe_drop() {
        let mut engine = MarketEngine::new(breaker_config()).unwrap();
        let sellers = NoiseConfig {
            buy_probability: 0.0,
            sell_probability: 1.0,
            ..Default::default()
        };
        for i in 0..30 {
            let mut agent = Agent::noise(format!("Holder{i}"), 1_000.0, i as f64 / 30.0, sellers.clone());
            agent.state.stock = 1_000;
            agent.state.average_cost = 30.0;
            engine.add_agent(agent).unwrap();
        }

        let first = engine.step().unwrap();
        assert!(first.sells > 0);
        assert_eq!(first.blocked, 0);

        let second = engine.step().unwrap();
        assert!((second.clearing_price as f64) < 0.5 * first.clearing_price as f64);
        assert!(second.blocked > 0);
        assert_eq!(second.sells, 0);
        assert!(!engine.behavioral_list().contains(&Behavior::Sell));
        assert!(engine.agents().iter().all(|a| a.state.stock <= 1_000));
    }

    #[test]
    fn test_emotion_sees_trades_settled_so_far() {
        // Swarm inertia 0 leaves the step-6 emotions untouched
        let config = EngineConfig {
            swarm: SwarmParams {
                w: 0.0,
                ..Default::default()
            },
            ..quiet_config(0)
        };
        let mut engine = MarketEngine::with_rng(config, StepRng::new(0, 0)).unwrap();

        // Every draw is 0.0: the seller always sells one share
        let seller_config = NoiseConfig {
            buy_probability: 0.0,
            sell_probability: 1.0,
            ..Default::default()
        };
        let mut seller = Agent::noise("Seller", 1_000.0, 0.0, seller_config);
        seller.state.stock = 10;
        seller.state.average_cost = 30.0;
        engine.add_agent(seller).unwrap();
        // Band mode below 80: buys everything affordable, no draws
        let buyer = Agent::value("Buyer", 100.0, 0.0, ValueConfig::price_band(80, 100));
        engine.add_agent(buyer).unwrap();

        let report = engine.step().unwrap();
        assert_eq!(report.clearing_price, 30);
        assert_eq!(engine.behavioral_list(), &[Behavior::Sell, Behavior::Buy]);

        // Price is flat, so net worth is unchanged and only the tags move emotion
        let seller = &engine.agents()[0].state;
        let buyer = &engine.agents()[1].state;
        assert_eq!((seller.cash, seller.stock), (1_030.0, 9));
        assert_eq!((buyer.cash, buyer.stock), (10.0, 3));
        // Seller settled first and saw [Sell]; buyer saw [Sell, Buy]
        assert_relative_eq!(seller.emotion, -1.0);
        assert_relative_eq!(buyer.emotion, 0.0);
    }
}

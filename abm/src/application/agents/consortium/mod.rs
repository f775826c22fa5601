//! Consortium Agent
//!
//! A composite agent modelling coordinated large capital. It owns a pool of
//! member strategies that share its ledger:
//! - Before every decision the consortium mirrors its cash/stock/cost into
//!   every member, so members never hold wealth of their own
//! - A member type is drawn with probability proportional to its head count,
//!   then one member of that type decides for the whole consortium
//! - The member's raw signal is gated by emotion, scaled by noise, and passed
//!   through momentum/drawdown overlays and cash/position limits

mod config;

pub use config::ConsortiumConfig;

use super::{Agent, DecisionContext, MarketView};
use crate::domain::emotion::{action_probability, emotion_gate};
use crate::domain::{AgentKind, AgentState, last_return};
use rand::Rng;

/// Consortium decision policy and its member pool
#[derive(Debug, Clone)]
pub struct Consortium {
    config: ConsortiumConfig,
    members: Vec<Agent>,
    /// High-water mark of net worth
    peak_value: f64,
}

impl Consortium {
    pub fn new(config: ConsortiumConfig, initial_value: f64) -> Self {
        Self {
            config,
            members: Vec::new(),
            peak_value: initial_value,
        }
    }

    pub fn add_member(&mut self, agent: Agent) {
        self.members.push(agent);
    }

    pub fn members(&self) -> &[Agent] {
        &self.members
    }

    pub fn config(&self) -> &ConsortiumConfig {
        &self.config
    }

    pub fn peak_value(&self) -> f64 {
        self.peak_value
    }

    pub fn reset(&mut self, initial_value: f64) {
        self.peak_value = initial_value;
        for member in &mut self.members {
            member.reset();
        }
    }

    /// Head count per member type, in order of first appearance
    pub fn type_weights(&self) -> Vec<(AgentKind, usize)> {
        let mut weights: Vec<(AgentKind, usize)> = Vec::new();
        for member in &self.members {
            match weights.iter_mut().find(|(kind, _)| *kind == member.kind()) {
                Some((_, count)) => *count += 1,
                None => weights.push((member.kind(), 1)),
            }
        }
        weights
    }

    /// Cumulative-weight draw over member types
    fn sample_kind<R: Rng + ?Sized>(weights: &[(AgentKind, usize)], rng: &mut R) -> Option<AgentKind> {
        let total: usize = weights.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return None;
        }
        let mut r = rng.r#gen::<f64>() * total as f64;
        for &(kind, count) in weights {
            if r < count as f64 {
                return Some(kind);
            }
            r -= count as f64;
        }
        weights.first().map(|(kind, _)| *kind)
    }

    /// Uniform draw among members of `kind`
    fn sample_member<R: Rng + ?Sized>(&self, kind: AgentKind, rng: &mut R) -> Option<usize> {
        let candidates: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.kind() == kind)
            .map(|(idx, _)| idx)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.gen_range(0..candidates.len())])
    }

    /// Pool-level facts handed to whichever member decides
    pub fn decision_context(&self, state: &AgentState) -> DecisionContext {
        DecisionContext {
            cash: state.cash,
            stock: state.stock,
            member_count: self.members.len(),
            type_weights: self.type_weights(),
        }
    }

    /// Copy the consortium ledger into every member
    fn mirror_into_members(&mut self, state: &AgentState) {
        for member in &mut self.members {
            member.state.mirror_ledger(state);
        }
    }

    /// Raw signal from one sampled member, re-drawing within the same type
    /// while the answer is zero.
    fn member_signal<R: Rng + ?Sized>(
        &mut self,
        state: &AgentState,
        view: &MarketView<'_>,
        rng: &mut R,
    ) -> i64 {
        let context = self.decision_context(state);
        let Some(kind) = Self::sample_kind(&context.type_weights, rng) else {
            return 0;
        };

        let member_view = MarketView {
            price: view.price,
            history: view.history,
            context: Some(&context),
        };

        for attempt in 0..=self.config.max_retries {
            let Some(idx) = self.sample_member(kind, rng) else {
                return 0;
            };
            let raw = self.members[idx].decide(&member_view, rng);
            if raw != 0 {
                log::trace!(
                    "[{}] {} member {} signalled {} (attempt {})",
                    state.id,
                    kind,
                    self.members[idx].id(),
                    raw,
                    attempt
                );
                return raw;
            }
        }
        0
    }

    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        state: &AgentState,
        view: &MarketView<'_>,
        rng: &mut R,
    ) -> i64 {
        if self.members.is_empty() || view.price <= 0 {
            return 0;
        }
        let price = view.price as f64;

        self.mirror_into_members(state);
        let intent = self.member_signal(state, view, rng);

        // Emotion gate: a Bernoulli draw unless configured as continuous
        let p = if self.config.continuous_gate {
            action_probability(state.emotion)
        } else {
            emotion_gate(state.emotion, rng) as f64
        };

        let mut delta = intent;
        if delta > 0 {
            delta = (delta as f64 * p).trunc() as i64;
        } else if delta < 0 {
            delta = (delta as f64 * (0.5 + 0.5 * p)).trunc() as i64;
        }

        let noise_scale = 0.8 + 0.4 * state.noise_offset;
        delta = (delta as f64 * noise_scale).trunc() as i64;
        if intent < 0 {
            delta = delta.min(-1);
        }

        // Momentum overlay: lean into falling markets
        if let Some(momentum) = last_return(view.history) {
            if momentum < self.config.momentum_threshold && delta < 0 {
                let amp = (1.0 + momentum.abs() * self.config.momentum_gain)
                    .min(self.config.max_sell_amplification);
                delta = (delta as f64 * amp).trunc() as i64;
            }
        }

        // Drawdown overlay
        let value = state.net_worth(price);
        if value > self.peak_value {
            self.peak_value = value;
        }
        let drawdown = if self.peak_value > 0.0 {
            (value - self.peak_value) / self.peak_value
        } else {
            0.0
        };
        if drawdown < self.config.drawdown_limit {
            let defensive = delta.abs().max(1);
            delta = delta.min(-defensive);
        }

        self.clip(state, price, value, delta)
    }

    /// Cash reserve, affordability, holdings and position-cap limits
    fn clip(&self, state: &AgentState, price: f64, value: f64, mut delta: i64) -> i64 {
        if delta > 0 {
            let reserve_cash = (state.cash - self.config.min_cash_ratio * value).max(0.0);
            let reserve_qty = (reserve_cash / price).floor() as i64;
            delta = delta.min(state.affordable(price)).min(reserve_qty);
        }

        let cap_value = self.config.max_position_ratio * value;
        let position_value = state.stock as f64 * price;
        if position_value > cap_value {
            let required = ((position_value - cap_value) / price).ceil() as i64;
            delta = -((-delta).max(required));
        }

        if delta < 0 {
            delta = -(-delta).min(state.stock);
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::{
        NoiseConfig, RiskParityConfig, TrendConfig, ValueConfig,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    fn owner(cash: f64, stock: i64, average_cost: f64) -> AgentState {
        let mut state = AgentState::new("consortium-1", AgentKind::Consortium, cash, 0.5);
        state.stock = stock;
        state.average_cost = average_cost;
        state
    }

    fn trend_only(count: usize, config: ConsortiumConfig, initial_value: f64) -> Consortium {
        let mut consortium = Consortium::new(config, initial_value);
        for k in 0..count {
            consortium.add_member(Agent::trend(format!("C-T{}", k), 10_000.0, 0.5, TrendConfig::default()));
        }
        consortium
    }

    #[test]
    fn test_empty_consortium_abstains() {
        let mut consortium = Consortium::new(ConsortiumConfig::default(), 300_000.0);
        let mut rng = StepRng::new(0, 0);
        let state = owner(300_000.0, 0, 0.0);
        assert_eq!(consortium.decide(&state, &MarketView::new(30, &[30, 30]), &mut rng), 0);
    }

    #[test]
    fn test_type_weights_in_first_appearance_order() {
        let mut consortium = Consortium::new(ConsortiumConfig::default(), 300_000.0);
        consortium.add_member(Agent::risk("R0", 5000.0, 0.1, RiskParityConfig::default()));
        consortium.add_member(Agent::value("V0", 1000.0, 0.2, ValueConfig::default()));
        consortium.add_member(Agent::risk("R1", 5000.0, 0.3, RiskParityConfig::default()));
        consortium.add_member(Agent::noise("N0", 10_000.0, 0.4, NoiseConfig::default()));

        assert_eq!(
            consortium.type_weights(),
            vec![(AgentKind::Risk, 2), (AgentKind::Value, 1), (AgentKind::Noise, 1)]
        );
    }

    #[test]
    fn test_decision_context_describes_pool() {
        let mut consortium = trend_only(3, ConsortiumConfig::default(), 300_000.0);
        consortium.add_member(Agent::value("C-V0", 1000.0, 0.2, ValueConfig::default()));

        let context = consortium.decision_context(&owner(120_000.0, 40, 30.0));
        assert_eq!(context.cash, 120_000.0);
        assert_eq!(context.stock, 40);
        assert_eq!(context.member_count, 4);
        assert_eq!(context.share_of(AgentKind::Trend), 0.75);
        assert_eq!(context.share_of(AgentKind::Value), 0.25);
        assert_eq!(context.share_of(AgentKind::Risk), 0.0);
    }

    #[test]
    fn test_members_mirror_ledger_before_deciding() {
        let mut consortium = trend_only(3, ConsortiumConfig::default(), 300_000.0);
        let state = owner(250_000.0, 120, 31.5);
        let mut rng = StdRng::seed_from_u64(3);
        consortium.decide(&state, &MarketView::new(30, &[30]), &mut rng);

        for member in consortium.members() {
            assert_eq!(member.state.cash, 250_000.0);
            assert_eq!(member.state.stock, 120);
            assert_eq!(member.state.average_cost, 31.5);
        }
    }

    #[test]
    fn test_buy_signal_uses_consortium_cash() {
        let mut consortium = Consortium::new(ConsortiumConfig::default(), 300_000.0);
        consortium.add_member(Agent::value("V0", 1000.0, 0.2, ValueConfig::default()));
        let state = owner(300_000.0, 0, 0.0);
        let history = [50, 48, 46, 44, 42];
        let mut rng = StepRng::new(0, 0);

        // floor(300000 * 0.3 / 40), well inside affordability and reserve
        let delta = consortium.decide(&state, &MarketView::new(40, &history), &mut rng);
        assert_eq!(delta, 2250);
    }

    #[test]
    fn test_sell_amplified_on_negative_momentum() {
        let mut consortium = Consortium::new(ConsortiumConfig::default(), 0.0);
        consortium.add_member(Agent::value("V0", 1000.0, 0.2, ValueConfig::default()));
        // +30% on cost: value member sells half
        let state = owner(10_000.0, 100, 10.0);
        let history = [20, 13];
        let mut rng = StepRng::new(0, 0);

        // -50 * 1.0 (open gate) * 1.0 (noise) * 1.5 (capped amplification)
        let delta = consortium.decide(&state, &MarketView::new(13, &history), &mut rng);
        assert_eq!(delta, -75);
    }

    #[test]
    fn test_continuous_gate_softens_sells() {
        let config = ConsortiumConfig::default().with_continuous_gate(true);
        let mut consortium = Consortium::new(config, 0.0);
        consortium.add_member(Agent::value("V0", 1000.0, 0.2, ValueConfig::default()));
        let state = owner(10_000.0, 100, 10.0);
        let history = [20, 13];
        let mut rng = StepRng::new(0, 0);

        // p = 0.5: trunc(-50 * 0.75) = -37, then trunc(-37 * 1.5) = -55
        let delta = consortium.decide(&state, &MarketView::new(13, &history), &mut rng);
        assert_eq!(delta, -55);
    }

    #[test]
    fn test_forced_sell_over_position_cap() {
        let state = owner(1000.0, 1000, 100.0);
        let value = state.net_worth(100.0);
        let mut consortium = trend_only(2, ConsortiumConfig::default(), value);
        let mut rng = StepRng::new(0, 0);

        // Trend members abstain on short history; the cap still forces
        // ceil((100000 - 0.8 * 101000) / 100) = 192 shares out.
        let delta = consortium.decide(&state, &MarketView::new(100, &[100]), &mut rng);
        assert_eq!(delta, -192);
    }

    #[test]
    fn test_drawdown_forces_defensive_sell() {
        let state = owner(99_000.0, 10, 100.0);
        let mut consortium = trend_only(2, ConsortiumConfig::default(), 200_000.0);
        let mut rng = StepRng::new(0, 0);

        let delta = consortium.decide(&state, &MarketView::new(100, &[100]), &mut rng);
        assert_eq!(delta, -1);
        assert_eq!(consortium.peak_value(), 200_000.0);
    }

    #[test]
    fn test_buys_respect_cash_reserve() {
        let config = ConsortiumConfig::default().with_min_cash_ratio(0.5);
        let mut consortium = Consortium::new(config, 0.0);
        consortium.add_member(Agent::value("V0", 1000.0, 0.9, ValueConfig::default()));
        let state = owner(10_000.0, 0, 0.0);
        let history = [50, 48, 46, 44, 42];
        let mut rng = StepRng::new(0, 0);

        // Member wants floor(10000 * 1.0 / 40) = 250; reserve leaves 5000 / 40
        let delta = consortium.decide(&state, &MarketView::new(40, &history), &mut rng);
        assert_eq!(delta, 125);
    }

    #[test]
    fn test_retries_raise_participation() {
        let state = owner(100_000.0, 1000, 50.0);
        let mut active = 0;
        let trials = 400;
        let mut rng = StdRng::seed_from_u64(2024);

        for _ in 0..trials {
            let mut consortium = Consortium::new(ConsortiumConfig::default(), 0.0);
            for k in 0..3 {
                consortium.add_member(Agent::noise(format!("N{}", k), 10_000.0, 0.5, NoiseConfig::default()));
            }
            let delta = consortium.decide(&state, &MarketView::new(50, &[50, 50]), &mut rng);
            if delta != 0 {
                active += 1;
            }
            assert!(delta.abs() <= 1000);
        }
        // A single draw would be active roughly a fifth of the time
        assert!(active > trials * 35 / 100, "active {}", active);
    }
}

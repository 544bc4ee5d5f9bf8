//! Population-driven growth phases.

use crate::config::{Config, PhaseConfig};
use crate::world::SimulationState;
use protocol::Phase;
use rand::Rng;

/// Classify a population against the configured thresholds.
pub fn determine_phase(population: usize, thresholds: &PhaseConfig) -> Phase {
    if population < thresholds.lag {
        Phase::Lag
    } else if population < thresholds.exponential {
        Phase::Exponential
    } else if population < thresholds.stationary {
        Phase::Stationary
    } else {
        Phase::Death
    }
}

/// Per-phase probabilities applied once per tick.
pub struct PhasePolicy<'a> {
    config: &'a Config,
}

impl<'a> PhasePolicy<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Chance that one random cell dies this tick.
    pub fn cull_chance(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Death => self.config.phase.death_cull_chance,
            Phase::Stationary => self.config.phase.stationary_cull_chance,
            Phase::Lag | Phase::Exponential => 0.0,
        }
    }

    /// Chance that one dot is added this tick.
    #[inline]
    pub fn dot_spawn_rate(&self, phase: Phase) -> f64 {
        self.config.dot.spawn_rates.get(phase)
    }
}

/// What the phase did this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseEffects {
    pub spawned_dot: Option<u32>,
    pub culled: Option<u32>,
}

/// Replenish dots and cull cells according to the current phase.
///
/// Culling never removes the last cell.
pub fn apply_phase_effects(
    state: &mut SimulationState,
    config: &Config,
    rng: &mut impl Rng,
) -> PhaseEffects {
    let policy = PhasePolicy::new(config);
    let phase = state.phase;
    let mut effects = PhaseEffects::default();

    if state.dots.len() < config.dot.max_amount && rng.random_bool(policy.dot_spawn_rate(phase)) {
        effects.spawned_dot = Some(state.spawn_dot(config, rng));
    }

    if state.population() > 1 && rng.random_bool(policy.cull_chance(phase)) {
        let index = rng.random_range(0..state.cells.len());
        effects.culled = Some(state.cells.remove(index).id);
    }

    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Color;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_phase_boundaries() {
        let thresholds = PhaseConfig::default();
        assert_eq!(determine_phase(0, &thresholds), Phase::Lag);
        assert_eq!(determine_phase(9, &thresholds), Phase::Lag);
        assert_eq!(determine_phase(10, &thresholds), Phase::Exponential);
        assert_eq!(determine_phase(49, &thresholds), Phase::Exponential);
        assert_eq!(determine_phase(50, &thresholds), Phase::Stationary);
        assert_eq!(determine_phase(79, &thresholds), Phase::Stationary);
        assert_eq!(determine_phase(80, &thresholds), Phase::Death);
        assert_eq!(determine_phase(1000, &thresholds), Phase::Death);
    }

    #[test]
    fn test_policy_rates() {
        let config = Config::default();
        let policy = PhasePolicy::new(&config);
        assert_eq!(policy.cull_chance(Phase::Lag), 0.0);
        assert_eq!(policy.cull_chance(Phase::Exponential), 0.0);
        assert_eq!(policy.cull_chance(Phase::Stationary), 0.01);
        assert_eq!(policy.cull_chance(Phase::Death), 0.02);
        assert_eq!(policy.dot_spawn_rate(Phase::Lag), 0.05);
        assert_eq!(policy.dot_spawn_rate(Phase::Exponential), 0.1);
        assert_eq!(policy.dot_spawn_rate(Phase::Stationary), 0.02);
        assert_eq!(policy.dot_spawn_rate(Phase::Death), 0.01);
    }

    fn forced_config() -> Config {
        let mut config = Config::default();
        config.dot.spawn_rates.death = 1.0;
        config.phase.death_cull_chance = 1.0;
        config
    }

    #[test]
    fn test_dot_spawn_respects_cap() {
        let config = forced_config();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut state = SimulationState::new(&config);
        state.phase = Phase::Death;

        for _ in 0..(config.dot.max_amount + 5) {
            apply_phase_effects(&mut state, &config, &mut rng);
        }
        assert_eq!(state.dots.len(), config.dot.max_amount);
    }

    #[test]
    fn test_cull_stops_at_one_cell() {
        let config = forced_config();
        let mut rng = Pcg32::seed_from_u64(2);
        let mut state = SimulationState::new(&config);
        state.phase = Phase::Death;
        for owner in 0..4 {
            state.spawn_starter(owner, Color::default(), &config, &mut rng);
        }

        let mut culled = 0;
        for _ in 0..10 {
            if apply_phase_effects(&mut state, &config, &mut rng).culled.is_some() {
                culled += 1;
            }
        }
        assert_eq!(culled, 3);
        assert_eq!(state.population(), 1);
    }

    #[test]
    fn test_lag_phase_never_culls() {
        let mut config = Config::default();
        config.phase.death_cull_chance = 1.0;
        config.phase.stationary_cull_chance = 1.0;
        let mut rng = Pcg32::seed_from_u64(3);
        let mut state = SimulationState::new(&config);
        for owner in 0..3 {
            state.spawn_starter(owner, Color::default(), &config, &mut rng);
        }

        for _ in 0..100 {
            assert!(apply_phase_effects(&mut state, &config, &mut rng).culled.is_none());
        }
        assert_eq!(state.population(), 3);
    }
}

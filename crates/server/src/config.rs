//! Server configuration.

use anyhow::bail;
use protocol::Phase;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub cell: CellConfig,
    #[serde(default)]
    pub dot: DotConfig,
    #[serde(default)]
    pub phase: PhaseConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    ///
    /// The `PORT` environment variable overrides `server.port`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(Path::new("config.toml"))?;
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Starvation timeout expressed in ticks.
    #[inline]
    pub fn starvation_ticks(&self) -> u64 {
        (self.cell.starvation_secs * self.server.tick_rate as f64).round() as u64
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.tick_rate == 0 {
            bail!("server.tick_rate must be positive");
        }
        if self.server.sample_interval_ms == 0 {
            bail!("server.sample_interval_ms must be positive");
        }
        let lengths = [
            ("arena.width", self.arena.width),
            ("arena.height", self.arena.height),
            ("arena.spawn_margin", self.arena.spawn_margin),
            ("arena.dot_margin", self.arena.dot_margin),
            ("cell.lag_size", self.cell.lag_size),
            ("cell.adapted_size", self.cell.adapted_size),
            ("cell.lag_speed", self.cell.lag_speed),
            ("cell.adapted_speed", self.cell.adapted_speed),
            ("cell.fission_jitter", self.cell.fission_jitter),
            ("dot.radius", self.dot.radius),
        ];
        for (name, value) in lengths {
            if !value.is_finite() {
                bail!("{} must be a finite number, got {}", name, value);
            }
        }
        if !self.cell.starvation_secs.is_finite() {
            bail!("cell.starvation_secs must be a finite number");
        }
        if !(self.arena.width > 0.0 && self.arena.height > 0.0) {
            bail!("arena dimensions must be positive");
        }
        let half_min = self.arena.width.min(self.arena.height) / 2.0;
        if self.arena.spawn_margin < 0.0 || self.arena.spawn_margin >= half_min {
            bail!("arena.spawn_margin must be in [0, {})", half_min);
        }
        if self.arena.dot_margin < 0.0 || self.arena.dot_margin >= half_min {
            bail!("arena.dot_margin must be in [0, {})", half_min);
        }
        if !(self.cell.lag_size > 0.0 && self.cell.adapted_size >= self.cell.lag_size) {
            bail!("cell sizes must be positive and adapted_size >= lag_size");
        }
        if self.cell.adapted_size * 2.0 >= self.arena.width.min(self.arena.height) {
            bail!("cell.adapted_size does not fit in the arena");
        }
        if self.cell.lag_speed < 0.0 || self.cell.adapted_speed < self.cell.lag_speed {
            bail!("cell speeds must be non-negative and adapted_speed >= lag_speed");
        }
        if self.cell.adaptation_threshold == 0 {
            bail!("cell.adaptation_threshold must be positive");
        }
        if self.cell.starvation_secs <= 0.0 {
            bail!("cell.starvation_secs must be positive");
        }
        if self.cell.fission_jitter < 0.0 {
            bail!("cell.fission_jitter must not be negative");
        }
        if self.dot.radius <= 0.0 {
            bail!("dot.radius must be positive");
        }
        let thresholds = &self.phase;
        if !(0 < thresholds.lag
            && thresholds.lag < thresholds.exponential
            && thresholds.exponential < thresholds.stationary)
        {
            bail!("phase thresholds must be positive and strictly ascending");
        }
        let probabilities = [
            ("dot.adaptation_chance", self.dot.adaptation_chance),
            ("dot.spawn_rates.lag", self.dot.spawn_rates.lag),
            ("dot.spawn_rates.exponential", self.dot.spawn_rates.exponential),
            ("dot.spawn_rates.stationary", self.dot.spawn_rates.stationary),
            ("dot.spawn_rates.death", self.dot.spawn_rates.death),
            ("phase.stationary_cull_chance", self.phase.stationary_cull_chance),
            ("phase.death_cull_chance", self.phase.death_cull_chance),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be a probability, got {}", name, value);
            }
        }
        if self.history.capacity == 0 {
            bail!("history.capacity must be positive");
        }
        Ok(())
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Simulation steps per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Interval between population history samples, in milliseconds.
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
    /// Directory with the browser client, served on every unmatched route
    /// (empty disables static serving).
    #[serde(default = "default_static_dir", skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
    /// Fixed RNG seed (random when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ServerConfig {
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    #[inline]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            tick_rate: default_tick_rate(),
            sample_interval_ms: default_sample_interval(),
            static_dir: default_static_dir(),
            seed: None,
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_tick_rate() -> u32 {
    60
}
fn default_sample_interval() -> u64 {
    1000
}
fn default_static_dir() -> Option<String> {
    Some("client".to_string())
}

/// Arena dimensions and spawn insets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaConfig {
    #[serde(default = "default_arena_width")]
    pub width: f32,
    #[serde(default = "default_arena_height")]
    pub height: f32,
    /// Distance from the border at which starter cells may appear.
    #[serde(default = "default_spawn_margin")]
    pub spawn_margin: f32,
    /// Distance from the border at which dots may appear.
    #[serde(default = "default_dot_margin")]
    pub dot_margin: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: default_arena_width(),
            height: default_arena_height(),
            spawn_margin: default_spawn_margin(),
            dot_margin: default_dot_margin(),
        }
    }
}

fn default_arena_width() -> f32 {
    800.0
}
fn default_arena_height() -> f32 {
    600.0
}
fn default_spawn_margin() -> f32 {
    50.0
}
fn default_dot_margin() -> f32 {
    20.0
}

/// Cell tiers and lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CellConfig {
    #[serde(default = "default_lag_size")]
    pub lag_size: f32,
    #[serde(default = "default_adapted_size")]
    pub adapted_size: f32,
    #[serde(default = "default_lag_speed")]
    pub lag_speed: f32,
    #[serde(default = "default_adapted_speed")]
    pub adapted_speed: f32,
    /// Adaptation dots needed for promotion.
    #[serde(default = "default_adaptation_threshold")]
    pub adaptation_threshold: u32,
    /// Seconds a cell survives without collecting a dot.
    #[serde(default = "default_starvation_secs")]
    pub starvation_secs: f64,
    /// Per-axis spread of the random jitter added to a fission child's heading.
    #[serde(default = "default_fission_jitter")]
    pub fission_jitter: f32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            lag_size: default_lag_size(),
            adapted_size: default_adapted_size(),
            lag_speed: default_lag_speed(),
            adapted_speed: default_adapted_speed(),
            adaptation_threshold: default_adaptation_threshold(),
            starvation_secs: default_starvation_secs(),
            fission_jitter: default_fission_jitter(),
        }
    }
}

fn default_lag_size() -> f32 {
    15.0
}
fn default_adapted_size() -> f32 {
    20.0
}
fn default_lag_speed() -> f32 {
    2.0
}
fn default_adapted_speed() -> f32 {
    5.0
}
fn default_adaptation_threshold() -> u32 {
    3
}
fn default_starvation_secs() -> f64 {
    30.0
}
fn default_fission_jitter() -> f32 {
    0.5
}

/// Dot pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DotConfig {
    #[serde(default = "default_dot_radius")]
    pub radius: f32,
    /// Dots seeded at start and on restart.
    #[serde(default = "default_dot_initial")]
    pub initial_amount: usize,
    /// Cap for phase-driven replenishment.
    #[serde(default = "default_dot_max")]
    pub max_amount: usize,
    /// Probability that a new dot is an adaptation dot.
    #[serde(default = "default_adaptation_chance")]
    pub adaptation_chance: f64,
    #[serde(default)]
    pub spawn_rates: PhaseRates,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            radius: default_dot_radius(),
            initial_amount: default_dot_initial(),
            max_amount: default_dot_max(),
            adaptation_chance: default_adaptation_chance(),
            spawn_rates: PhaseRates::default(),
        }
    }
}

fn default_dot_radius() -> f32 {
    5.0
}
fn default_dot_initial() -> usize {
    15
}
fn default_dot_max() -> usize {
    20
}
fn default_adaptation_chance() -> f64 {
    0.3
}

/// Per-tick dot spawn probability for each phase.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PhaseRates {
    #[serde(default = "default_rate_lag")]
    pub lag: f64,
    #[serde(default = "default_rate_exponential")]
    pub exponential: f64,
    #[serde(default = "default_rate_stationary")]
    pub stationary: f64,
    #[serde(default = "default_rate_death")]
    pub death: f64,
}

impl PhaseRates {
    #[inline]
    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Lag => self.lag,
            Phase::Exponential => self.exponential,
            Phase::Stationary => self.stationary,
            Phase::Death => self.death,
        }
    }
}

impl Default for PhaseRates {
    fn default() -> Self {
        Self {
            lag: default_rate_lag(),
            exponential: default_rate_exponential(),
            stationary: default_rate_stationary(),
            death: default_rate_death(),
        }
    }
}

fn default_rate_lag() -> f64 {
    0.05
}
fn default_rate_exponential() -> f64 {
    0.1
}
fn default_rate_stationary() -> f64 {
    0.02
}
fn default_rate_death() -> f64 {
    0.01
}

/// Population thresholds and phase culling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhaseConfig {
    /// Populations below this are in the lag phase.
    #[serde(default = "default_threshold_lag")]
    pub lag: usize,
    /// Populations below this (and at least `lag`) are exponential.
    #[serde(default = "default_threshold_exponential")]
    pub exponential: usize,
    /// Populations below this (and at least `exponential`) are stationary; above is death.
    #[serde(default = "default_threshold_stationary")]
    pub stationary: usize,
    #[serde(default = "default_stationary_cull")]
    pub stationary_cull_chance: f64,
    #[serde(default = "default_death_cull")]
    pub death_cull_chance: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            lag: default_threshold_lag(),
            exponential: default_threshold_exponential(),
            stationary: default_threshold_stationary(),
            stationary_cull_chance: default_stationary_cull(),
            death_cull_chance: default_death_cull(),
        }
    }
}

fn default_threshold_lag() -> usize {
    10
}
fn default_threshold_exponential() -> usize {
    50
}
fn default_threshold_stationary() -> usize {
    80
}
fn default_stationary_cull() -> f64 {
    0.01
}
fn default_death_cull() -> f64 {
    0.02
}

/// Population history settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Samples kept before the oldest is dropped.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.tick_rate, 60);
        assert_eq!(config.cell.adaptation_threshold, 3);
        assert_eq!(config.history.capacity, 300);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [arena]
            width = 1024.0

            [dot.spawn_rates]
            death = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.arena.width, 1024.0);
        assert_eq!(config.arena.height, 600.0);
        assert_eq!(config.dot.spawn_rates.death, 0.5);
        assert_eq!(config.dot.spawn_rates.lag, 0.05);
        assert_eq!(config.server.static_dir.as_deref(), Some("client"));
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.phase.stationary, 80);
        assert_eq!(parsed.cell.starvation_secs, 30.0);
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = Config::default();
        config.phase.exponential = config.phase.stationary;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_probability() {
        let mut config = Config::default();
        config.phase.death_cull_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_margin() {
        let mut config = Config::default();
        config.arena.spawn_margin = 300.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let mut config = Config::default();
        config.arena.spawn_margin = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cell.starvation_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.arena.width = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cell.fission_jitter = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cell.fission_jitter = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_from_toml_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [arena]
            dot_margin = nan
            "#,
        )
        .unwrap();
        assert!(config.arena.dot_margin.is_nan());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval() {
        let server = ServerConfig::default();
        assert_eq!(server.tick_interval().as_micros(), 16_666);
        assert_eq!(server.sample_interval(), Duration::from_millis(1000));
    }
}

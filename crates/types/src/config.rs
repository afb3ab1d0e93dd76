use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FitnessWeights;

/// Source of randomness for one run: `fixed:<seed>` or `time-based`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(try_from = "String", into = "String")]
pub enum SeedMode {
    Fixed(u64),
    TimeBased,
}

impl FromStr for SeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "time-based" {
            return Ok(SeedMode::TimeBased);
        }
        match s.strip_prefix("fixed:") {
            Some(n) => n
                .trim()
                .parse::<u64>()
                .map(SeedMode::Fixed)
                .map_err(|e| format!("invalid fixed seed {n:?}: {e}")),
            None => Err(format!(
                "unknown seed mode {s:?}, expected `fixed:<seed>` or `time-based`"
            )),
        }
    }
}

impl TryFrom<String> for SeedMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SeedMode> for String {
    fn from(m: SeedMode) -> Self {
        m.to_string()
    }
}

impl fmt::Display for SeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedMode::Fixed(n) => write!(f, "fixed:{n}"),
            SeedMode::TimeBased => f.write_str("time-based"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneticParams {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub mutation_min: f64,
    pub mutation_max: f64,
    pub crossover_rate: f64,
    pub crossover_min: f64,
    pub crossover_max: f64,
    /// Amount added to or removed from the rates on each adaptation.
    pub adapt_step: f64,
    pub tournament_size: usize,
    pub elite_count: usize,
    /// Stale generations before the rates are raised.
    pub stagnation_threshold: usize,
    /// Stale generations before the search stops.
    pub patience: usize,
    pub diversity_threshold: f64,
    pub injection_fraction: f64,
    pub local_search_every: usize,
    pub local_search_top: usize,
    pub local_search_iterations: usize,
    pub pattern_bonus: f64,
    pub pattern_capacity: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            mutation_min: 0.01,
            mutation_max: 0.5,
            crossover_rate: 0.8,
            crossover_min: 0.5,
            crossover_max: 0.95,
            adapt_step: 0.05,
            tournament_size: 3,
            elite_count: 2,
            stagnation_threshold: 5,
            patience: 40,
            diversity_threshold: 0.15,
            injection_fraction: 0.2,
            local_search_every: 10,
            local_search_top: 3,
            local_search_iterations: 30,
            pattern_bonus: 0.02,
            pattern_capacity: 512,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnealingParams {
    pub candidates: usize,
    pub iterations: usize,
    pub temperature: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub cooling_rate: f64,
    pub cooling_min: f64,
    pub cooling_max: f64,
    /// Below this temperature worsening moves are never accepted.
    pub min_temperature: f64,
    /// Probability of drawing each pairing-plan component at random.
    pub randomization: f64,
    pub randomization_min: f64,
    pub randomization_max: f64,
    pub memory_capacity: usize,
    pub plateau_window: usize,
    pub plateau_epsilon: f64,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            candidates: 8,
            iterations: 600,
            temperature: 0.5,
            temperature_min: 0.05,
            temperature_max: 5.0,
            cooling_rate: 0.995,
            cooling_min: 0.9,
            cooling_max: 0.999,
            min_temperature: 1e-4,
            randomization: 0.5,
            randomization_min: 0.1,
            randomization_max: 0.9,
            memory_capacity: 20,
            plateau_window: 3,
            plateau_epsilon: 1e-3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicWeights {
    pub enabled: bool,
    pub rate: f64,
    pub momentum: f64,
    pub history_len: usize,
    pub min_weight: f64,
}

impl Default for DynamicWeights {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0.05,
            momentum: 0.3,
            history_len: 5,
            min_weight: 0.01,
        }
    }
}

/// Scale of each soft-constraint penalty, applied per offending item and
/// divided by the number of projects.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PenaltyWeights {
    pub instructor_double_booking: f64,
    pub classroom_double_booking: f64,
    pub unavailable: f64,
    pub jury_size: f64,
    pub supervisor_shortfall: f64,
    pub missing_project: f64,
    pub duplicate_project: f64,
    pub responsible_mismatch: f64,
    pub final_min_supervisors: usize,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            instructor_double_booking: 0.6,
            classroom_double_booking: 0.6,
            unavailable: 0.3,
            jury_size: 0.2,
            supervisor_shortfall: 0.1,
            missing_project: 1.0,
            duplicate_project: 1.0,
            responsible_mismatch: 0.3,
            final_min_supervisors: 2,
        }
    }
}

impl PenaltyWeights {
    pub fn zero() -> Self {
        Self {
            instructor_double_booking: 0.0,
            classroom_double_booking: 0.0,
            unavailable: 0.0,
            jury_size: 0.0,
            supervisor_shortfall: 0.0,
            missing_project: 0.0,
            duplicate_project: 0.0,
            responsible_mismatch: 0.0,
            final_min_supervisors: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderConfig {
    /// Probability that a fresh candidate uses a paired plan instead of a random draw.
    pub structured_probability: f64,
    /// At or below this many classrooms, paired sessions may change classroom.
    pub flexible_classroom_threshold: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            structured_probability: 0.8,
            flexible_classroom_threshold: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    #[schemars(with = "String")]
    pub seed: SeedMode,
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
    #[serde(default)]
    pub recommendations: bool,
    #[serde(default)]
    pub genetic: GeneticParams,
    #[serde(default)]
    pub annealing: AnnealingParams,
    #[serde(default)]
    pub weights: FitnessWeights,
    #[serde(default)]
    pub dynamic_weights: DynamicWeights,
    #[serde(default)]
    pub penalties: PenaltyWeights,
    #[serde(default)]
    pub builder: BuilderConfig,
}

fn default_time_limit_ms() -> u64 {
    30_000
}

impl OptimizerConfig {
    pub fn new(seed: SeedMode) -> Self {
        Self {
            seed,
            time_limit_ms: default_time_limit_ms(),
            recommendations: false,
            genetic: GeneticParams::default(),
            annealing: AnnealingParams::default(),
            weights: FitnessWeights::default(),
            dynamic_weights: DynamicWeights::default(),
            penalties: PenaltyWeights::default(),
            builder: BuilderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_mode_parses() {
        assert_eq!("fixed:42".parse::<SeedMode>(), Ok(SeedMode::Fixed(42)));
        assert_eq!("time-based".parse::<SeedMode>(), Ok(SeedMode::TimeBased));
        assert!("fixed:x".parse::<SeedMode>().is_err());
        assert!("random".parse::<SeedMode>().is_err());
    }

    #[test]
    fn config_requires_seed() {
        assert!(serde_json::from_str::<OptimizerConfig>("{}").is_err());
        let cfg: OptimizerConfig =
            serde_json::from_str(r#"{"seed":"fixed:7","genetic":{"populationSize":12}}"#).unwrap();
        assert_eq!(cfg.seed, SeedMode::Fixed(7));
        assert_eq!(cfg.genetic.population_size, 12);
        assert_eq!(cfg.genetic.generations, GeneticParams::default().generations);
    }

    #[test]
    fn negative_population_is_rejected_at_parse() {
        let r = serde_json::from_str::<OptimizerConfig>(
            r#"{"seed":"time-based","genetic":{"populationSize":-5}}"#,
        );
        assert!(r.is_err());
    }
}

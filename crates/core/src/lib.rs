pub mod builder;
pub mod metrics;
pub mod moves;
pub mod prep;
pub mod rng;
pub mod scoring;
pub mod weights;

use std::collections::HashSet;
use thiserror::Error;

pub use builder::{build, random_strategy, BuildStrategy, PairingPlan};
pub use metrics::{solved, RunSummary};
pub use prep::{Placed, Prep};
pub use rng::{resolve_seed, rng_from_seed, stream_seed};
pub use scoring::{compute_scores, Scores, ViolationCounts};
pub use types::{
    Assignment, OptimizerConfig, Snapshot, Solution, SolveResult, SubScores,
};
pub use weights::{Evaluation, FitnessEvaluator};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Rejects configurations the optimizers cannot run with. Called before any
/// search starts.
pub fn validate_config(cfg: &OptimizerConfig) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    let unit = |name: &str, v: f64, errors: &mut Vec<String>| {
        if !(0.0..=1.0).contains(&v) {
            errors.push(format!("{name} must be within [0, 1], got {v}"));
        }
    };
    let bounded = |name: &str, lo: f64, v: f64, hi: f64, errors: &mut Vec<String>| {
        if lo > hi {
            errors.push(format!("{name} bounds are inverted ({lo} > {hi})"));
        } else if !(lo..=hi).contains(&v) {
            errors.push(format!("{name} {v} lies outside [{lo}, {hi}]"));
        }
    };

    let g = &cfg.genetic;
    if g.population_size == 0 {
        errors.push("genetic.populationSize must be positive".into());
    }
    if g.generations == 0 {
        errors.push("genetic.generations must be positive".into());
    }
    for (name, v) in [
        ("genetic.mutationRate", g.mutation_rate),
        ("genetic.mutationMin", g.mutation_min),
        ("genetic.mutationMax", g.mutation_max),
        ("genetic.crossoverRate", g.crossover_rate),
        ("genetic.crossoverMin", g.crossover_min),
        ("genetic.crossoverMax", g.crossover_max),
        ("genetic.diversityThreshold", g.diversity_threshold),
        ("genetic.injectionFraction", g.injection_fraction),
    ] {
        unit(name, v, &mut errors);
    }
    bounded("genetic.mutationRate", g.mutation_min, g.mutation_rate, g.mutation_max, &mut errors);
    bounded("genetic.crossoverRate", g.crossover_min, g.crossover_rate, g.crossover_max, &mut errors);
    if g.tournament_size == 0 || g.tournament_size > g.population_size {
        errors.push(format!(
            "genetic.tournamentSize must be in 1..={}, got {}",
            g.population_size, g.tournament_size
        ));
    }
    if g.elite_count == 0 || g.elite_count > g.population_size {
        errors.push(format!(
            "genetic.eliteCount must be in 1..={}, got {}",
            g.population_size, g.elite_count
        ));
    }
    if !(g.adapt_step >= 0.0) {
        errors.push("genetic.adaptStep must be non-negative".into());
    }
    if !(g.pattern_bonus >= 0.0) {
        errors.push("genetic.patternBonus must be non-negative".into());
    }

    let a = &cfg.annealing;
    if a.candidates == 0 {
        errors.push("annealing.candidates must be positive".into());
    }
    if a.memory_capacity == 0 {
        errors.push("annealing.memoryCapacity must be positive".into());
    }
    if !(a.temperature > 0.0) || !(a.temperature_min > 0.0) {
        errors.push("annealing temperatures must be positive".into());
    }
    bounded("annealing.temperature", a.temperature_min, a.temperature, a.temperature_max, &mut errors);
    if !(a.cooling_min > 0.0 && a.cooling_max < 1.0) {
        errors.push("annealing cooling bounds must lie inside (0, 1)".into());
    }
    bounded("annealing.coolingRate", a.cooling_min, a.cooling_rate, a.cooling_max, &mut errors);
    unit("annealing.randomization", a.randomization, &mut errors);
    bounded(
        "annealing.randomization",
        a.randomization_min,
        a.randomization,
        a.randomization_max,
        &mut errors,
    );
    if !(a.min_temperature >= 0.0) {
        errors.push("annealing.minTemperature must be non-negative".into());
    }

    let w = &cfg.weights;
    if types::Metric::ALL.iter().any(|&m| !(w.get(m) >= 0.0)) {
        errors.push("fitness weights must be non-negative".into());
    } else if w.sum() <= 0.0 {
        errors.push("fitness weights must not all be zero".into());
    }
    let d = &cfg.dynamic_weights;
    if !(d.min_weight >= 0.0) || !(d.rate >= 0.0) || !(d.momentum >= 0.0) {
        errors.push("dynamicWeights rate, momentum and minWeight must be non-negative".into());
    }
    unit("builder.structuredProbability", cfg.builder.structured_probability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidConfig(errors.join("; ")))
    }
}

/// Integrity check of an input snapshot; all problems are reported together.
pub fn validate_snapshot(snap: &Snapshot) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    for (name, empty) in [
        ("instructors", snap.instructors.is_empty()),
        ("projects", snap.projects.is_empty()),
        ("classrooms", snap.classrooms.is_empty()),
        ("timeSlots", snap.time_slots.is_empty()),
    ] {
        if empty {
            errors.push(format!("{name} is empty"));
        }
    }

    fn chk_unique<'a>(name: &str, ids: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                errors.push(format!("duplicate {name} id: {id}"));
            }
        }
    }
    chk_unique("instructor", snap.instructors.iter().map(|x| x.id.0.as_str()), &mut errors);
    chk_unique("project", snap.projects.iter().map(|x| x.id.0.as_str()), &mut errors);
    chk_unique("classroom", snap.classrooms.iter().map(|x| x.id.0.as_str()), &mut errors);
    chk_unique("time slot", snap.time_slots.iter().map(|x| x.id.0.as_str()), &mut errors);

    for t in &snap.time_slots {
        if !t.is_valid_format() {
            errors.push(format!("time slot {} has invalid format {}-{}", t.id, t.start, t.end));
        }
    }

    let instructors: HashSet<_> = snap.instructors.iter().map(|t| &t.id).collect();
    for t in &snap.instructors {
        if !t.availability.is_empty() && t.availability.len() != snap.time_slots.len() {
            errors.push(format!(
                "instructor {} availability covers {} slots, expected {}",
                t.id,
                t.availability.len(),
                snap.time_slots.len()
            ));
        }
    }
    for p in &snap.projects {
        if !instructors.contains(&p.responsible) {
            errors.push(format!(
                "project {} references missing instructor {}",
                p.id, p.responsible
            ));
        }
        if p.panel_size() > snap.instructors.len() {
            errors.push(format!(
                "project {} needs a panel of {} but only {} instructors exist",
                p.id,
                p.panel_size(),
                snap.instructors.len()
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidSnapshot(errors.join("; ")))
    }
}

/// A search engine producing defense schedules. Implementations own their
/// learning state, which carries across successive calls.
pub trait Optimizer: Send {
    fn name(&self) -> &'static str;
    fn optimize(&mut self, snapshot: &Snapshot) -> SolveResult;
}

//! Pairing-driven candidates refined by simulated annealing.
//!
//! Candidates are built first; the fitness weights then move toward the weak
//! dimensions of the best-built candidate, and every candidate is annealed
//! with the adjusted weights.

mod anneal;
mod memory;

pub use anneal::{acceptance_probability, anneal, GeometricCooling, Outcome};
pub use memory::{Remembered, SolutionMemory};

use rand::Rng;
use rayon::prelude::*;
use sched_core::{
    build, resolve_seed, rng_from_seed, solved, stream_seed, validate_config, validate_snapshot,
    BuildStrategy, FitnessEvaluator, Optimizer, PairingPlan, Prep, RunSummary, ValidationError,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use types::{AnnealingParams, Assignment, OptimizerConfig, Snapshot, SolveResult};

/// Annealing parameters that adapt from run to run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    pub temperature: f64,
    pub cooling_rate: f64,
    pub randomization: f64,
}

impl Tuning {
    fn from_params(a: &AnnealingParams) -> Self {
        Self {
            temperature: a.temperature,
            cooling_rate: a.cooling_rate,
            randomization: a.randomization,
        }
    }

    /// Explore more after a plateau, exploit more while runs keep improving.
    fn adapt(&mut self, a: &AnnealingParams, plateau: bool) {
        if plateau {
            self.temperature *= 1.2;
            self.cooling_rate += (a.cooling_max - self.cooling_rate) * 0.5;
            self.randomization += 0.1;
        } else {
            self.temperature *= 0.9;
            self.cooling_rate += (a.cooling_min - self.cooling_rate) * 0.5;
            self.randomization -= 0.05;
        }
        self.temperature = self.temperature.clamp(a.temperature_min, a.temperature_max);
        self.cooling_rate = self.cooling_rate.clamp(a.cooling_min, a.cooling_max);
        self.randomization = self.randomization.clamp(a.randomization_min, a.randomization_max);
    }
}

pub struct AnnealingOptimizer {
    config: OptimizerConfig,
    evaluator: FitnessEvaluator,
    memory: SolutionMemory,
    tuning: Tuning,
    recent_bests: VecDeque<f64>,
}

impl AnnealingOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        Ok(Self {
            evaluator: FitnessEvaluator::from_config(&config),
            memory: SolutionMemory::new(config.annealing.memory_capacity),
            tuning: Tuning::from_params(&config.annealing),
            recent_bests: VecDeque::new(),
            config,
        })
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    pub fn memory(&self) -> &SolutionMemory {
        &self.memory
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    /// True when the last `plateau_window` run bests rose by less than
    /// `plateau_epsilon`; `None` until enough runs are recorded.
    fn plateau(&self) -> Option<bool> {
        let a = &self.config.annealing;
        let window = a.plateau_window.max(2);
        if self.recent_bests.len() < window {
            return None;
        }
        let first = self.recent_bests[self.recent_bests.len() - window];
        let top = self
            .recent_bests
            .iter()
            .skip(self.recent_bests.len() - window)
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Some(top - first < a.plateau_epsilon)
    }

    fn record_best(&mut self, fitness: f64) {
        self.recent_bests.push_back(fitness);
        while self.recent_bests.len() > self.config.annealing.plateau_window.max(2) {
            self.recent_bests.pop_front();
        }
    }
}

impl Optimizer for AnnealingOptimizer {
    fn name(&self) -> &'static str {
        "annealing"
    }

    fn optimize(&mut self, snapshot: &Snapshot) -> SolveResult {
        if snapshot.is_empty() {
            warn!("snapshot has an empty collection; nothing to schedule");
            return SolveResult::no_solution(self.name(), "empty snapshot");
        }
        if let Err(e) = validate_snapshot(snapshot) {
            warn!(error = %e, "snapshot has integrity problems; continuing");
        }

        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.time_limit_ms);
        let seed = resolve_seed(self.config.seed);
        let mut rng = rng_from_seed(seed);
        let prep = Prep::new(snapshot);
        let a = self.config.annealing.clone();
        let tuning = self.tuning;
        info!(
            seed,
            candidates = a.candidates,
            temperature = tuning.temperature,
            cooling = tuning.cooling_rate,
            randomization = tuning.randomization,
            "annealing search started"
        );

        let plans: Vec<PairingPlan> = (0..a.candidates)
            .map(|_| PairingPlan::randomized(&mut rng, tuning.randomization))
            .collect();
        let streams: u64 = rng.gen();

        let builder = &self.config.builder;
        let prep_ref = &prep;
        let built: Vec<(Vec<Assignment>, f64, _)> = {
            let ev = &self.evaluator;
            plans
                .into_par_iter()
                .enumerate()
                .map(|(k, plan)| {
                    let mut r = rng_from_seed(stream_seed(streams, k as u64));
                    let start = build(prep_ref, BuildStrategy::Paired(plan), builder, &mut r);
                    let fitness = ev.fitness(prep_ref, &start.assignments, 0.0).fitness;
                    (start.assignments, fitness, r)
                })
                .collect()
        };

        let mut reweighted = false;
        if self.config.dynamic_weights.enabled {
            let leader = built.iter().max_by(|x, y| x.1.total_cmp(&y.1));
            if let Some((assignments, fitness, _)) = leader {
                let e = self.evaluator.evaluate(&prep, assignments);
                reweighted = e.scores.is_some();
                debug!(leader = *fitness, rescored = e.fitness, "fitness weights follow the best build");
            }
        }

        let ev = &self.evaluator;
        let outcomes: Vec<Outcome> = built
            .into_par_iter()
            .map(|(start, _, mut r)| {
                let cooling = GeometricCooling::new(
                    tuning.temperature,
                    tuning.cooling_rate,
                    a.min_temperature,
                );
                anneal(prep_ref, ev, start, cooling, a.iterations, deadline, &mut r)
            })
            .collect();

        let mut best: Option<&Outcome> = None;
        for (k, o) in outcomes.iter().enumerate() {
            debug!(
                candidate = k,
                fitness = o.fitness,
                iterations = o.iterations,
                accepted = o.accepted,
                "candidate annealed"
            );
            if best.map_or(true, |b| o.fitness > b.fitness) {
                best = Some(o);
            }
        }
        let Some(best) = best.cloned() else {
            return SolveResult::no_solution(self.name(), "no candidates were built");
        };

        self.memory.remember(best.assignments.clone(), best.fitness);
        self.record_best(best.fitness);
        let plateau = self.plateau();
        if let Some(p) = plateau {
            self.tuning.adapt(&a, p);
        }

        let stats = serde_json::json!({
            "method": self.name(),
            "seed": seed,
            "candidates": outcomes.iter().map(|o| o.fitness).collect::<Vec<_>>(),
            "iterations": outcomes.iter().map(|o| o.iterations).sum::<usize>(),
            "temperature": tuning.temperature,
            "coolingRate": tuning.cooling_rate,
            "randomization": tuning.randomization,
            "finalTemperature": best.final_temperature,
            "plateau": plateau,
            "reweighted": reweighted,
            "nextWeights": self.evaluator.weights(),
            "next": {
                "temperature": self.tuning.temperature,
                "coolingRate": self.tuning.cooling_rate,
                "randomization": self.tuning.randomization,
            },
            "memory": {
                "size": self.memory.len(),
                "best": self.memory.best().map(|r| r.fitness),
            },
        });
        let result = solved(
            &prep,
            &self.evaluator,
            RunSummary {
                assignments: best.assignments,
                fitness: best.fitness,
                iterations: best.iterations,
                execution_ms: started.elapsed().as_millis() as u64,
                recommendations: self.config.recommendations,
                stats,
            },
        );
        info!(
            fitness = result.objective,
            elapsed_ms = result.metrics.execution_ms,
            "annealing search finished"
        );
        result
    }
}

//! Single-candidate simulated annealing.
//!
//! Fitness is maximised, so a move with `delta = new - old >= 0` is always
//! taken and a worsening one with probability `exp(delta / T)`. The geometric
//! schedule multiplies `T` by the cooling rate after every iteration; once it
//! is frozen at the minimum temperature only non-worsening moves pass.

use rand::Rng;
use sched_core::moves::{perturb, MoveKind};
use sched_core::{FitnessEvaluator, Prep, Scores};
use std::time::Instant;
use types::Assignment;

/// Metropolis acceptance for a maximisation problem.
pub fn acceptance_probability(delta: f64, temperature: f64) -> f64 {
    if delta.is_nan() {
        return 0.0;
    }
    if delta >= 0.0 {
        return 1.0;
    }
    if temperature <= 0.0 {
        return 0.0;
    }
    (delta / temperature).exp()
}

/// `T_{k+1} = T_k * alpha`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricCooling {
    current: f64,
    alpha: f64,
    min_temp: f64,
}

impl GeometricCooling {
    pub fn new(initial: f64, alpha: f64, min_temp: f64) -> Self {
        Self {
            current: initial,
            alpha,
            min_temp,
        }
    }

    #[inline]
    pub fn update(&mut self) {
        self.current *= self.alpha;
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.current <= self.min_temp
    }

    pub fn accept<R: Rng>(&self, delta: f64, rng: &mut R) -> bool {
        let p = acceptance_probability(delta, self.current);
        p >= 1.0 || (!self.is_frozen() && rng.gen::<f64>() < p)
    }
}

#[derive(Clone, Debug)]
pub struct Outcome {
    pub assignments: Vec<Assignment>,
    pub fitness: f64,
    pub scores: Option<Scores>,
    pub iterations: usize,
    pub accepted: usize,
    pub final_temperature: f64,
}

pub fn anneal<R: Rng>(
    prep: &Prep,
    ev: &FitnessEvaluator,
    start: Vec<Assignment>,
    mut cooling: GeometricCooling,
    iterations: usize,
    deadline: Instant,
    rng: &mut R,
) -> Outcome {
    let first = ev.fitness(prep, &start, 0.0);
    let mut current = start;
    let mut current_fitness = first.fitness;
    let mut best = Outcome {
        assignments: current.clone(),
        fitness: first.fitness,
        scores: first.scores,
        iterations: 0,
        accepted: 0,
        final_temperature: cooling.current(),
    };

    let mut done = 0;
    let mut accepted = 0;
    while done < iterations && Instant::now() < deadline {
        done += 1;
        let mut trial = current.clone();
        if perturb(prep, &mut trial, &MoveKind::ALL, rng) {
            let e = ev.fitness(prep, &trial, 0.0);
            if cooling.accept(e.fitness - current_fitness, rng) {
                accepted += 1;
                current = trial;
                current_fitness = e.fitness;
                if current_fitness > best.fitness {
                    best.assignments = current.clone();
                    best.fitness = current_fitness;
                    best.scores = e.scores;
                }
            }
        }
        cooling.update();
    }

    best.iterations = done;
    best.accepted = accepted;
    best.final_temperature = cooling.current();
    best
}

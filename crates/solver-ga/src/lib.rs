//! Population-based search over defense schedules.
//!
//! A seeded mix of random and pairing-based candidates evolves by tournament
//! selection, project-order crossover and slot/classroom mutation. Mutation
//! and crossover rates adapt to stagnation, low structural diversity triggers
//! fresh injections, and the best individuals are periodically hill-climbed.
//! After every generation the fitness weights move toward the weak
//! dimensions of the generation best, so the next generation (and the next
//! run) is scored with the adjusted weights.

mod patterns;
mod population;

pub use patterns::PatternMemory;
pub use population::{crossover, diversity, hamming, seeding_strategy, tournament, Individual};

use rand::Rng;
use rayon::prelude::*;
use sched_core::moves::{perturb, MoveKind};
use sched_core::{
    build, random_strategy, resolve_seed, rng_from_seed, solved, stream_seed, validate_config,
    validate_snapshot, FitnessEvaluator, Optimizer, Prep, RunSummary, ValidationError,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use types::{GeneticParams, OptimizerConfig, Snapshot, SolveResult, SubScores};

const DIVERSITY_SAMPLES: usize = 30;

pub struct GeneticOptimizer {
    config: OptimizerConfig,
    evaluator: FitnessEvaluator,
    patterns: PatternMemory,
    mutation_rate: f64,
    crossover_rate: f64,
}

impl GeneticOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        Ok(Self {
            evaluator: FitnessEvaluator::from_config(&config),
            patterns: PatternMemory::new(config.genetic.pattern_capacity),
            mutation_rate: config.genetic.mutation_rate,
            crossover_rate: config.genetic.crossover_rate,
            config,
        })
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    pub fn patterns(&self) -> &PatternMemory {
        &self.patterns
    }

    /// Current (mutation, crossover) rates.
    pub fn rates(&self) -> (f64, f64) {
        (self.mutation_rate, self.crossover_rate)
    }

    fn evaluate_all(&self, prep: &Prep, pop: &mut [Individual]) {
        let scale = self.config.genetic.pattern_bonus;
        let ev = &self.evaluator;
        let patterns = &self.patterns;
        pop.par_iter_mut().for_each(|ind| {
            let bonus = patterns.bonus(&ind.assignments, scale);
            let e = ev.fitness(prep, &ind.assignments, bonus);
            ind.fitness = e.fitness;
            ind.scores = e.scores;
        });
    }

    fn adapt(&mut self, improved: bool, stale: usize) {
        let g = &self.config.genetic;
        if improved {
            self.mutation_rate -= g.adapt_step;
            self.crossover_rate -= g.adapt_step;
        } else if stale >= g.stagnation_threshold.max(1) {
            self.mutation_rate += g.adapt_step;
            self.crossover_rate += g.adapt_step;
        }
        self.mutation_rate = self.mutation_rate.clamp(g.mutation_min, g.mutation_max);
        self.crossover_rate = self.crossover_rate.clamp(g.crossover_min, g.crossover_max);
    }

    fn breed<R: Rng>(&self, prep: &Prep, ranked: &[Individual], rng: &mut R) -> Vec<Individual> {
        let g = &self.config.genetic;
        let mut next: Vec<Individual> = ranked.iter().take(g.elite_count).cloned().collect();
        while next.len() < g.population_size {
            let a = tournament(ranked, g.tournament_size, rng);
            let mut child = if rng.gen_bool(self.crossover_rate) {
                let b = tournament(ranked, g.tournament_size, rng);
                crossover(&a.assignments, &b.assignments, rng)
            } else {
                a.assignments.clone()
            };
            if rng.gen_bool(self.mutation_rate) {
                perturb(prep, &mut child, &MoveKind::RELOCATE, rng);
            }
            next.push(Individual::new(child));
        }
        next
    }

    /// Reweights from the leader's sub-scores. Returns whether the weights moved.
    fn reweight_from(&mut self, prep: &Prep, leader: &Individual) -> bool {
        if !self.config.dynamic_weights.enabled {
            return false;
        }
        let e = self.evaluator.evaluate(prep, &leader.assignments);
        debug!(leader = leader.fitness, rescored = e.fitness, "fitness weights follow the leader");
        e.scores.is_some()
    }

    /// Replaces the worst `injection_fraction` (never elites) with fresh builds.
    fn inject<R: Rng>(&self, prep: &Prep, ranked: &mut Vec<Individual>, rng: &mut R) -> usize {
        let g = &self.config.genetic;
        let room = ranked.len().saturating_sub(g.elite_count);
        let count = ((ranked.len() as f64 * g.injection_fraction).ceil() as usize).min(room);
        ranked.truncate(ranked.len() - count);
        let mut fresh: Vec<Individual> = (0..count)
            .map(|_| {
                let strategy = random_strategy(rng, &self.config.builder);
                Individual::new(build(prep, strategy, &self.config.builder, rng).assignments)
            })
            .collect();
        self.evaluate_all(prep, &mut fresh);
        ranked.extend(fresh);
        count
    }

    /// Hill-climbs the first `local_search_top` individuals in place.
    fn local_search(&self, prep: &Prep, ranked: &mut [Individual], seed: u64) {
        let g = &self.config.genetic;
        let top = g.local_search_top.min(ranked.len());
        let scale = g.pattern_bonus;
        let ev = &self.evaluator;
        let patterns = &self.patterns;
        ranked[..top]
            .par_iter_mut()
            .enumerate()
            .for_each(|(k, ind)| {
                let mut rng = rng_from_seed(stream_seed(seed, k as u64));
                for _ in 0..g.local_search_iterations {
                    let mut trial = ind.assignments.clone();
                    if !perturb(prep, &mut trial, &MoveKind::ALL, &mut rng) {
                        continue;
                    }
                    let e = ev.fitness(prep, &trial, patterns.bonus(&trial, scale));
                    if e.fitness >= ind.fitness {
                        ind.assignments = trial;
                        ind.fitness = e.fitness;
                        ind.scores = e.scores;
                    }
                }
            });
    }
}

fn rank(pop: &mut [Individual]) {
    pop.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

fn top_decile(pop: &[Individual]) -> usize {
    (pop.len() / 10).max(1)
}

fn learn(patterns: &mut PatternMemory, elite: &[Individual]) {
    for ind in elite {
        patterns.learn(&ind.assignments);
    }
}

impl Optimizer for GeneticOptimizer {
    fn name(&self) -> &'static str {
        "genetic"
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
        let budget = Duration::from_millis(self.config.time_limit_ms);
        let seed = resolve_seed(self.config.seed);
        let mut rng = rng_from_seed(seed);
        let prep = Prep::new(snapshot);
        let g: GeneticParams = self.config.genetic.clone();
        info!(
            seed,
            population = g.population_size,
            generations = g.generations,
            projects = prep.n_projects(),
            "genetic search started"
        );

        let mut pop = population::seed_population(&prep, g.population_size, &self.config.builder, &mut rng);
        self.evaluate_all(&prep, &mut pop);
        rank(&mut pop);
        learn(&mut self.patterns, &pop[..top_decile(&pop)]);
        let mut reweights = usize::from(self.reweight_from(&prep, &pop[0]));

        // best keeps the fitness it was observed with
        let mut best = pop[0].clone();
        let first_best = best.fitness;
        let first_scores: SubScores = best.scores.as_ref().map(|s| s.sub).unwrap_or_default();
        let mut history = vec![best.fitness];
        let (mut stale, mut since_improvement) = (0usize, 0usize);
        let mut generation = 0usize;
        let mut last_diversity = 0.0;
        let mut injected = 0usize;
        let mut timed_out = false;

        while generation < g.generations {
            if started.elapsed() >= budget {
                timed_out = true;
                break;
            }
            generation += 1;

            pop = self.breed(&prep, &pop, &mut rng);
            self.evaluate_all(&prep, &mut pop);
            rank(&mut pop);

            last_diversity = diversity(&pop, DIVERSITY_SAMPLES, &mut rng);
            if last_diversity < g.diversity_threshold {
                injected += self.inject(&prep, &mut pop, &mut rng);
                rank(&mut pop);
            }
            if g.local_search_every > 0 && generation % g.local_search_every == 0 {
                let ls_seed: u64 = rng.gen();
                self.local_search(&prep, &mut pop, ls_seed);
                rank(&mut pop);
            }

            let improved = pop[0].fitness > best.fitness;
            if improved {
                best = pop[0].clone();
                stale = 0;
                since_improvement = 0;
            } else {
                stale += 1;
                since_improvement += 1;
            }
            self.adapt(improved, stale);
            if stale >= g.stagnation_threshold.max(1) {
                stale = 0;
            }
            learn(&mut self.patterns, &pop[..top_decile(&pop)]);
            history.push(best.fitness);
            reweights += usize::from(self.reweight_from(&prep, &pop[0]));

            debug!(
                generation,
                best = best.fitness,
                diversity = last_diversity,
                mutation = self.mutation_rate,
                crossover = self.crossover_rate,
                "generation done"
            );
            if since_improvement >= g.patience.max(1) {
                debug!(generation, "no improvement within patience; stopping");
                break;
            }
        }

        let stats = serde_json::json!({
            "method": self.name(),
            "seed": seed,
            "generations": generation,
            "timedOut": timed_out,
            "mutationRate": self.mutation_rate,
            "crossoverRate": self.crossover_rate,
            "diversity": last_diversity,
            "injected": injected,
            "patterns": self.patterns.len(),
            "reweights": reweights,
            "nextWeights": self.evaluator.weights(),
            "firstGeneration": { "fitness": first_best, "scores": first_scores },
            "history": history,
        });
        let result = solved(
            &prep,
            &self.evaluator,
            RunSummary {
                assignments: best.assignments,
                fitness: best.fitness,
                iterations: generation,
                execution_ms: started.elapsed().as_millis() as u64,
                recommendations: self.config.recommendations,
                stats,
            },
        );
        info!(
            fitness = result.objective,
            generations = generation,
            elapsed_ms = result.metrics.execution_ms,
            "genetic search finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{
        Classroom, Instructor, InstructorCategory, Metric, Project, ProjectKind, SeedMode,
        TimeSlot,
    };

    fn snapshot() -> Snapshot {
        let instructors: Vec<Instructor> = (0..5)
            .map(|i| Instructor {
                id: format!("i{i}").as_str().into(),
                name: format!("Instructor {i}"),
                category: InstructorCategory::Supervisor,
                availability: vec![],
                load: 5 - i,
                expertise: vec![],
                collaborations: Default::default(),
            })
            .collect();
        Snapshot {
            projects: (0..10)
                .map(|p| Project {
                    id: format!("p{p}").as_str().into(),
                    responsible: instructors[p % 5].id.clone(),
                    jury_size: 1,
                    kind: if p % 2 == 0 { ProjectKind::Interim } else { ProjectKind::Final },
                    topic: None,
                    difficulty: None,
                })
                .collect(),
            instructors,
            classrooms: (0..3)
                .map(|c| Classroom {
                    id: format!("c{c}").as_str().into(),
                    name: format!("Room {c}"),
                    capacity: 20,
                    features: vec![],
                })
                .collect(),
            time_slots: (0..8)
                .map(|t| TimeSlot {
                    id: format!("t{t}").as_str().into(),
                    start: format!("{:02}:00", 9 + t),
                    end: format!("{:02}:45", 9 + t),
                    day: 0,
                })
                .collect(),
        }
    }

    fn optimizer() -> GeneticOptimizer {
        GeneticOptimizer::new(OptimizerConfig::new(SeedMode::Fixed(1))).unwrap()
    }

    fn ranked(ga: &GeneticOptimizer, prep: &Prep, n: usize, seed: u64) -> Vec<Individual> {
        let mut rng = rng_from_seed(seed);
        let mut pop = population::seed_population(prep, n, &ga.config.builder, &mut rng);
        ga.evaluate_all(prep, &mut pop);
        rank(&mut pop);
        pop
    }

    #[test]
    fn rates_adapt_within_bounds() {
        let mut ga = optimizer();
        let g = ga.config.genetic.clone();
        let start = ga.rates();

        ga.adapt(false, 0);
        assert_eq!(ga.rates(), start);

        for _ in 0..40 {
            ga.adapt(false, g.stagnation_threshold);
            let (m, c) = ga.rates();
            assert!((g.mutation_min..=g.mutation_max).contains(&m));
            assert!((g.crossover_min..=g.crossover_max).contains(&c));
        }
        assert_eq!(ga.rates(), (g.mutation_max, g.crossover_max));

        for _ in 0..40 {
            ga.adapt(true, 0);
        }
        assert_eq!(ga.rates(), (g.mutation_min, g.crossover_min));
    }

    #[test]
    fn injection_replaces_the_worst_and_spares_elites() {
        let snap = snapshot();
        let prep = Prep::new(&snap);
        let mut ga = optimizer();
        ga.config.genetic.elite_count = 3;
        let mut rng = rng_from_seed(9);

        let mut pop = ranked(&ga, &prep, 10, 2);
        let before = pop.clone();
        let n = ga.inject(&prep, &mut pop, &mut rng);
        assert_eq!(n, 2);
        assert_eq!(pop.len(), 10);
        for (now, was) in pop.iter().zip(&before).take(8) {
            assert_eq!(now.assignments, was.assignments);
            assert_eq!(now.fitness, was.fitness);
        }
        assert!(pop[8..].iter().all(|i| i.fitness.is_finite()));

        // even a full injection leaves the elites alone
        ga.config.genetic.injection_fraction = 1.0;
        let mut pop = ranked(&ga, &prep, 10, 3);
        let elites: Vec<Individual> = pop[..3].to_vec();
        assert_eq!(ga.inject(&prep, &mut pop, &mut rng), 7);
        for (now, was) in pop.iter().zip(&elites) {
            assert_eq!(now.assignments, was.assignments);
            assert_eq!(now.fitness, was.fitness);
        }
    }

    #[test]
    fn local_search_never_lowers_fitness() {
        let snap = snapshot();
        let prep = Prep::new(&snap);
        let ga = optimizer();
        let top = ga.config.genetic.local_search_top;
        let mut pop = ranked(&ga, &prep, 8, 4);
        let before = pop.clone();
        ga.local_search(&prep, &mut pop, 11);

        for (now, was) in pop.iter().zip(&before).take(top) {
            assert!(now.fitness >= was.fitness);
            let rescored = ga.evaluator.fitness(&prep, &now.assignments, 0.0).fitness;
            assert!((rescored - now.fitness).abs() < 1e-12);
        }
        for (now, was) in pop.iter().zip(&before).skip(top) {
            assert_eq!(now.assignments, was.assignments);
        }
    }

    #[test]
    fn pattern_bonus_is_never_decisive() {
        let snap = snapshot();
        let prep = Prep::new(&snap);
        let mut ga = optimizer();
        let scale = ga.config.genetic.pattern_bonus;
        let lightest = Metric::ALL
            .iter()
            .map(|&m| ga.evaluator.weights().get(m))
            .fold(f64::INFINITY, f64::min);
        assert!(scale < lightest);

        let mut pop = ranked(&ga, &prep, 12, 5);
        learn(&mut ga.patterns, &pop);
        assert!(!ga.patterns.is_empty());
        ga.evaluate_all(&prep, &mut pop);
        for ind in &pop {
            let bonus = ga.patterns.bonus(&ind.assignments, scale);
            assert!((0.0..=scale + 1e-12).contains(&bonus));
            let plain = ga.evaluator.fitness(&prep, &ind.assignments, 0.0).fitness;
            assert!(ind.fitness - plain <= scale + 1e-12);
        }
        // learned solutions are rewarded
        let first = &pop[0];
        assert!(ga.patterns.bonus(&first.assignments, scale) > 0.0);
    }
}

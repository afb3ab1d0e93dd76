use rand::Rng;
use sched_core::builder::{PairStrategy, SlotStrategy, SortStrategy, SplitStrategy};
use sched_core::{build, BuildStrategy, PairingPlan, Prep, Scores};
use types::{Assignment, BuilderConfig};

#[derive(Clone, Debug)]
pub struct Individual {
    pub assignments: Vec<Assignment>,
    pub fitness: f64,
    pub scores: Option<Scores>,
}

impl Individual {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self {
            assignments,
            fitness: f64::NEG_INFINITY,
            scores: None,
        }
    }
}

/// Build strategy for slot `k` of an initial population of `n`:
/// 20% random, 30% load-sorted consecutive pairing, 20% load buckets,
/// 15% distributed slots, the rest classroom-diverse.
pub fn seeding_strategy(k: usize, n: usize) -> BuildStrategy {
    let cut = |pct: usize| (n * pct + 50) / 100;
    let (random, paired, buckets, distributed) = (cut(20), cut(50), cut(70), cut(85));
    // vary the pairing criterion and split inside each share
    let pair = PairStrategy::ALL[k % PairStrategy::ALL.len()];
    let split = SplitStrategy::ALL[(k / PairStrategy::ALL.len()) % SplitStrategy::ALL.len()];
    let plan = |sort, slot| PairingPlan {
        sort,
        split,
        pair,
        slot,
    };
    if k < random {
        BuildStrategy::Random
    } else if k < paired {
        BuildStrategy::Paired(plan(SortStrategy::LoadDescending, SlotStrategy::Consecutive))
    } else if k < buckets {
        BuildStrategy::Paired(plan(SortStrategy::LoadBuckets, SlotStrategy::Consecutive))
    } else if k < distributed {
        BuildStrategy::Paired(plan(SortStrategy::LoadJitter, SlotStrategy::Distributed))
    } else {
        BuildStrategy::Paired(plan(SortStrategy::LoadDescending, SlotStrategy::ClassroomDiverse))
    }
}

pub fn seed_population<R: Rng>(
    prep: &Prep,
    n: usize,
    cfg: &BuilderConfig,
    rng: &mut R,
) -> Vec<Individual> {
    (0..n)
        .map(|k| Individual::new(build(prep, seeding_strategy(k, n), cfg, rng).assignments))
        .collect()
}

pub fn tournament<'a, R: Rng>(pop: &'a [Individual], k: usize, rng: &mut R) -> &'a Individual {
    let mut best = &pop[rng.gen_range(0..pop.len())];
    for _ in 1..k {
        let c = &pop[rng.gen_range(0..pop.len())];
        if c.fitness > best.fitness {
            best = c;
        }
    }
    best
}

/// Single-point crossover over project order: the head of `a`, the tail of `b`.
pub fn crossover<R: Rng>(a: &[Assignment], b: &[Assignment], rng: &mut R) -> Vec<Assignment> {
    let n = a.len().min(b.len());
    if n < 2 {
        return a.to_vec();
    }
    let point = rng.gen_range(1..n);
    a[..point].iter().chain(&b[point..]).cloned().collect()
}

/// Share of positions at which two solutions differ.
pub fn hamming(a: &[Assignment], b: &[Assignment]) -> f64 {
    let n = a.len().max(b.len());
    if n == 0 {
        return 0.0;
    }
    let differing = (0..n).filter(|&i| a.get(i) != b.get(i)).count();
    differing as f64 / n as f64
}

/// Mean normalised Hamming distance over up to `samples` random pairs.
pub fn diversity<R: Rng>(pop: &[Individual], samples: usize, rng: &mut R) -> f64 {
    if pop.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for _ in 0..samples {
        let i = rng.gen_range(0..pop.len());
        let j = (i + rng.gen_range(1..pop.len())) % pop.len();
        total += hamming(&pop[i].assignments, &pop[j].assignments);
    }
    total / samples.max(1) as f64
}

use std::collections::VecDeque;
use tracing::debug;
use types::{Assignment, DynamicWeights, FitnessWeights, Metric, OptimizerConfig, PenaltyWeights, SubScores};

use crate::prep::Prep;
use crate::scoring::{compute_scores, Scores, ViolationCounts};

#[derive(Clone, Debug)]
pub struct Evaluation {
    pub fitness: f64,
    pub scores: Option<Scores>,
}

impl Evaluation {
    pub fn malformed() -> Self {
        Self {
            fitness: f64::NEG_INFINITY,
            scores: None,
        }
    }
}

/// Weighted multi-objective fitness with self-adjusting weights.
///
/// The `&self` methods are pure and safe to call from worker threads; only
/// [`FitnessEvaluator::reweight`] and [`FitnessEvaluator::evaluate`] mutate the
/// weights and their history.
#[derive(Clone, Debug)]
pub struct FitnessEvaluator {
    weights: FitnessWeights,
    history: VecDeque<FitnessWeights>,
    dynamic: DynamicWeights,
    penalties: PenaltyWeights,
}

impl FitnessEvaluator {
    pub fn new(weights: FitnessWeights, dynamic: DynamicWeights, penalties: PenaltyWeights) -> Self {
        let mut weights = weights;
        weights.normalize();
        Self {
            weights,
            history: VecDeque::new(),
            dynamic,
            penalties,
        }
    }

    pub fn from_config(cfg: &OptimizerConfig) -> Self {
        Self::new(cfg.weights, cfg.dynamic_weights.clone(), cfg.penalties.clone())
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    pub fn penalties(&self) -> &PenaltyWeights {
        &self.penalties
    }

    pub fn history(&self) -> impl Iterator<Item = &FitnessWeights> {
        self.history.iter()
    }

    pub fn score(&self, prep: &Prep, assignments: &[Assignment]) -> Option<Scores> {
        compute_scores(prep, assignments, self.penalties.final_min_supervisors)
    }

    pub fn penalty(&self, v: &ViolationCounts, projects: usize) -> f64 {
        let p = &self.penalties;
        let raw = p.instructor_double_booking * v.instructor_double_bookings as f64
            + p.classroom_double_booking * v.classroom_double_bookings as f64
            + p.unavailable * v.unavailable as f64
            + p.jury_size * v.jury_size as f64
            + p.supervisor_shortfall * v.supervisor_shortfall as f64
            + p.missing_project * v.missing_projects as f64
            + p.duplicate_project * v.duplicate_projects as f64
            + p.responsible_mismatch * v.responsible_mismatch as f64;
        raw / projects.max(1) as f64
    }

    /// Weighted sum with the current weights, minus penalties, plus `bonus`.
    pub fn combine(&self, scores: &Scores, projects: usize, bonus: f64) -> f64 {
        let weighted: f64 = Metric::ALL
            .iter()
            .map(|&m| self.weights.get(m) * scores.sub.get(m))
            .sum();
        weighted - self.penalty(&scores.violations, projects) + bonus
    }

    /// Scores and combines with the current weights, leaving them untouched.
    pub fn fitness(&self, prep: &Prep, assignments: &[Assignment], bonus: f64) -> Evaluation {
        match self.score(prep, assignments) {
            Some(s) => Evaluation {
                fitness: self.combine(&s, prep.n_projects(), bonus),
                scores: Some(s),
            },
            None => Evaluation::malformed(),
        }
    }

    /// Single-call evaluation: adjusts the weights toward the weak dimensions
    /// of this solution, then combines with the adjusted weights.
    pub fn evaluate(&mut self, prep: &Prep, assignments: &[Assignment]) -> Evaluation {
        let Some(s) = self.score(prep, assignments) else {
            return Evaluation::malformed();
        };
        if self.dynamic.enabled {
            self.reweight(&s.sub);
        }
        Evaluation {
            fitness: self.combine(&s, prep.n_projects(), 0.0),
            scores: Some(s),
        }
    }

    /// Nudges each weight up by `rate * max(1 - score, 0.1)`, continues the
    /// recent trend of the weight history, and renormalises to sum 1.0.
    pub fn reweight(&mut self, sub: &SubScores) {
        let cfg = &self.dynamic;
        let trend = self.trend();
        let mut next = self.weights;
        for (k, m) in Metric::ALL.into_iter().enumerate() {
            let s = sub.get(m);
            let s = if s.is_finite() { s.clamp(0.0, 1.0) } else { 0.0 };
            let w = self.weights.get(m) + cfg.rate * (1.0 - s).max(0.1) + cfg.momentum * trend[k];
            next.set(m, if w.is_finite() { w.max(cfg.min_weight.max(0.0)) } else { cfg.min_weight.max(0.0) });
        }
        next.normalize();

        self.history.push_back(self.weights);
        while self.history.len() > cfg.history_len.max(1) {
            self.history.pop_front();
        }
        debug!(?next, "fitness weights adjusted");
        self.weights = next;
    }

    /// Mean per-step change over the history window, ending at the current weights.
    fn trend(&self) -> [f64; 6] {
        let mut out = [0.0; 6];
        let Some(first) = self.history.front() else {
            return out;
        };
        let steps = self.history.len() as f64;
        for (k, m) in Metric::ALL.into_iter().enumerate() {
            out[k] = (self.weights.get(m) - first.get(m)) / steps;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prep::fixtures::snapshot;

    fn evaluator() -> FitnessEvaluator {
        FitnessEvaluator::new(
            FitnessWeights::default(),
            DynamicWeights::default(),
            PenaltyWeights::default(),
        )
    }

    #[test]
    fn weak_dimensions_gain_weight() {
        let mut ev = evaluator();
        let before = *ev.weights();
        let sub = SubScores {
            workload: 0.1,
            pairing: 1.0,
            schedule: 1.0,
            diversity: 1.0,
            time_slot: 1.0,
            classroom: 1.0,
        };
        ev.reweight(&sub);
        let after = ev.weights();
        assert!(after.workload > before.workload);
        assert!(after.classroom < before.classroom);
        assert!((after.sum() - 1.0).abs() < 1e-9);
        assert_eq!(ev.history().count(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut ev = evaluator();
        for _ in 0..20 {
            ev.reweight(&SubScores::default());
        }
        assert_eq!(ev.history().count(), DynamicWeights::default().history_len);
    }

    #[test]
    fn malformed_scores_negative_infinity() {
        let snap = snapshot(2, 2, 1, 2);
        let prep = Prep::new(&snap);
        let mut ev = evaluator();
        let e = ev.evaluate(&prep, &[]);
        assert_eq!(e.fitness, f64::NEG_INFINITY);
        assert!(e.scores.is_none());
        assert_eq!(ev.history().count(), 0);
    }

    #[test]
    fn penalties_lower_fitness() {
        let snap = snapshot(2, 2, 1, 2);
        let prep = Prep::new(&snap);
        let ev = evaluator();
        let a = |p: &str, t: &str, j: [&str; 2]| Assignment {
            project_id: p.into(),
            classroom_id: "c0".into(),
            time_slot_id: t.into(),
            responsible_id: j[0].into(),
            jury: j.iter().map(|&x| x.into()).collect(),
        };
        let clean = vec![a("p0", "t0", ["i0", "i1"]), a("p1", "t1", ["i1", "i0"])];
        let clash = vec![a("p0", "t0", ["i0", "i1"]), a("p1", "t0", ["i1", "i0"])];
        assert!(ev.fitness(&prep, &clean, 0.0).fitness > ev.fitness(&prep, &clash, 0.0).fitness);
    }
}

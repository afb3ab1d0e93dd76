use std::collections::BTreeMap;
use types::{
    Assignment, ClassroomId, InstructorId, Metric, PenaltyWeights, SolveMetrics, SolveResult,
    SolveStatus, Violation,
};

use crate::prep::Prep;
use crate::scoring::{Scores, ViolationCounts};
use crate::weights::FitnessEvaluator;

const OVERLOAD_FACTOR: f64 = 1.5;
const LOW_SCORE: f64 = 0.5;

/// What an optimizer run hands back for reporting.
pub struct RunSummary {
    pub assignments: Vec<Assignment>,
    pub fitness: f64,
    pub iterations: usize,
    pub execution_ms: u64,
    pub recommendations: bool,
    pub stats: serde_json::Value,
}

/// Assembles the public result for a finished run. The best solution is
/// rescored with the evaluator's current weights to fill the report.
pub fn solved(prep: &Prep, ev: &FitnessEvaluator, run: RunSummary) -> SolveResult {
    let Some(scores) = ev.score(prep, &run.assignments) else {
        return SolveResult::no_solution(
            run.stats.get("method").and_then(|m| m.as_str()).unwrap_or("unknown"),
            "best candidate could not be scored",
        );
    };
    let violations = violation_report(&scores.violations, ev.penalties(), prep.n_projects());
    let mut metrics = usage(prep, &run.assignments, &scores);
    metrics.fitness = run.fitness;
    metrics.iterations = run.iterations;
    metrics.execution_ms = run.execution_ms;
    metrics.weights = Some(*ev.weights());
    if run.recommendations {
        metrics.recommendations = recommendations(prep, &run.assignments, &scores);
    }
    SolveResult {
        status: SolveStatus::Solved,
        objective: run.fitness,
        assignments: run.assignments,
        violations,
        metrics,
        stats: run.stats,
    }
}

fn usage(prep: &Prep, assignments: &[Assignment], scores: &Scores) -> SolveMetrics {
    let mut classroom_usage: BTreeMap<ClassroomId, usize> = prep
        .snap
        .classrooms
        .iter()
        .map(|c| (c.id.clone(), 0))
        .collect();
    for a in assignments {
        if let Some(n) = classroom_usage.get_mut(&a.classroom_id) {
            *n += 1;
        }
    }
    let instructor_load: BTreeMap<InstructorId, usize> = prep
        .snap
        .instructors
        .iter()
        .zip(&scores.appearances)
        .map(|(t, &n)| (t.id.clone(), n))
        .collect();
    SolveMetrics {
        scores: scores.sub,
        classroom_usage,
        instructor_load,
        ..Default::default()
    }
}

/// One entry per violated constraint class; `weight` is its share of the
/// fitness penalty.
pub fn violation_report(v: &ViolationCounts, p: &PenaltyWeights, projects: usize) -> Vec<Violation> {
    let per = projects.max(1) as f64;
    [
        ("instructor_double_booking", v.instructor_double_bookings, p.instructor_double_booking),
        ("classroom_double_booking", v.classroom_double_bookings, p.classroom_double_booking),
        ("instructor_unavailable", v.unavailable, p.unavailable),
        ("jury_size", v.jury_size, p.jury_size),
        ("supervisor_shortfall", v.supervisor_shortfall, p.supervisor_shortfall),
        ("missing_project", v.missing_projects, p.missing_project),
        ("duplicate_project", v.duplicate_projects, p.duplicate_project),
        ("responsible_mismatch", v.responsible_mismatch, p.responsible_mismatch),
    ]
    .into_iter()
    .filter(|&(_, count, _)| count > 0)
    .map(|(kind, count, penalty)| Violation {
        r#type: kind.into(),
        weight: penalty * count as f64 / per,
        details: serde_json::json!({ "count": count }),
    })
    .collect()
}

/// Human-readable hints about imbalances in a solution.
pub fn recommendations(prep: &Prep, assignments: &[Assignment], scores: &Scores) -> Vec<String> {
    let mut out = Vec::new();
    let n = scores.appearances.len();
    if n > 0 {
        let mean = scores.appearances.iter().sum::<usize>() as f64 / n as f64;
        for (i, &c) in scores.appearances.iter().enumerate() {
            let id = &prep.instructor(i).id;
            if mean > 0.0 && c as f64 > OVERLOAD_FACTOR * mean {
                out.push(format!(
                    "instructor {id} sits on {c} panels (mean {mean:.1}); consider redistributing"
                ));
            } else if c == 0 {
                out.push(format!("instructor {id} is not on any panel"));
            }
        }
    }

    let mut used = vec![false; prep.n_classrooms()];
    let mut placed = vec![false; prep.n_projects()];
    for a in assignments {
        if let Some(&c) = prep.idx_classroom.get(a.classroom_id.0.as_str()) {
            used[c] = true;
        }
        if let Some(&p) = prep.idx_project.get(a.project_id.0.as_str()) {
            placed[p] = true;
        }
    }
    for c in (0..used.len()).filter(|&c| !used[c]) {
        out.push(format!("classroom {} is unused", prep.snap.classrooms[c].id));
    }
    let missing = placed.iter().filter(|&&p| !p).count();
    if missing > 0 {
        out.push(format!("{missing} project(s) have no defense session"));
    }

    for m in Metric::ALL {
        let s = scores.sub.get(m);
        if s < LOW_SCORE {
            out.push(format!("{m} score is low ({s:.2})"));
        }
    }
    out
}

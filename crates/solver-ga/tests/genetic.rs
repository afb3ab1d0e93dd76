use sched_core::Optimizer;
use solver_ga::GeneticOptimizer;
use std::collections::HashSet;
use types::*;

fn defense_snapshot(loads: &[u32], rooms: usize, slots: usize, projects: usize) -> Snapshot {
    let instructors: Vec<Instructor> = loads
        .iter()
        .enumerate()
        .map(|(i, &load)| Instructor {
            id: format!("i{i}").as_str().into(),
            name: format!("Instructor {i}"),
            category: if i < 3 { InstructorCategory::Supervisor } else { InstructorCategory::Assistant },
            availability: vec![],
            load,
            expertise: vec![["ml", "db", "web"][i % 3].to_string()],
            collaborations: Default::default(),
        })
        .collect();
    let projects = (0..projects)
        .map(|p| Project {
            id: format!("p{p}").as_str().into(),
            responsible: instructors[p % 3].id.clone(),
            jury_size: 1,
            kind: if p % 3 == 0 { ProjectKind::Final } else { ProjectKind::Interim },
            topic: None,
            difficulty: None,
        })
        .collect();
    let classrooms = (0..rooms)
        .map(|c| Classroom {
            id: format!("c{c}").as_str().into(),
            name: format!("Room {c}"),
            capacity: 25,
            features: vec![],
        })
        .collect();
    let time_slots = (0..slots)
        .map(|t| TimeSlot {
            id: format!("t{t}").as_str().into(),
            start: format!("{:02}:00", 9 + t % 6),
            end: format!("{:02}:45", 9 + t % 6),
            day: (t / 6) as u32,
        })
        .collect();
    Snapshot {
        instructors,
        projects,
        classrooms,
        time_slots,
    }
}

fn config(seed: u64) -> OptimizerConfig {
    let mut cfg = OptimizerConfig::new(SeedMode::Fixed(seed));
    cfg.genetic.population_size = 50;
    cfg.genetic.generations = 30;
    cfg
}

fn first_generation(res: &SolveResult) -> (f64, f64) {
    let first = &res.stats["firstGeneration"];
    (
        first["fitness"].as_f64().unwrap(),
        first["scores"]["workload"].as_f64().unwrap(),
    )
}

#[test]
fn workload_never_regresses_below_first_generation() {
    let snap = defense_snapshot(&[6, 4, 3, 2], 3, 12, 15);
    let mut cfg = config(42);
    cfg.weights = FitnessWeights {
        workload: 1.0,
        pairing: 0.0,
        schedule: 0.0,
        diversity: 0.0,
        time_slot: 0.0,
        classroom: 0.0,
    };
    cfg.penalties = PenaltyWeights::zero();
    cfg.genetic.pattern_bonus = 0.0;
    cfg.dynamic_weights.enabled = false;

    let mut ga = GeneticOptimizer::new(cfg).unwrap();
    let res = ga.optimize(&snap);
    assert_eq!(res.status, SolveStatus::Solved);
    assert!(res.assignments.len() <= snap.projects.len());
    let (_, first_workload) = first_generation(&res);
    assert!(
        res.metrics.scores.workload >= first_workload - 1e-12,
        "{} < {}",
        res.metrics.scores.workload,
        first_workload
    );
}

#[test]
fn best_history_is_monotone_with_default_weights() {
    let snap = defense_snapshot(&[6, 4, 3, 2], 3, 12, 15);
    let mut ga = GeneticOptimizer::new(config(7)).unwrap();
    let res = ga.optimize(&snap);

    let (first_fitness, _) = first_generation(&res);
    assert!(res.objective >= first_fitness);

    let history: Vec<f64> = res.stats["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert!(!history.is_empty());
    assert!(history.windows(2).all(|w| w[1] >= w[0]), "{history:?}");
    assert_eq!(*history.last().unwrap(), res.objective);

    let ids: HashSet<_> = res.assignments.iter().map(|a| &a.project_id).collect();
    assert_eq!(ids.len(), res.assignments.len());
}

#[test]
fn weights_adjust_every_generation_and_carry_over_between_runs() {
    let snap = defense_snapshot(&[6, 4, 3, 2], 3, 12, 15);
    let mut cfg = config(3);
    cfg.genetic.generations = 5;
    cfg.genetic.population_size = 12;
    let history_len = cfg.dynamic_weights.history_len;
    let mut ga = GeneticOptimizer::new(cfg).unwrap();
    let before = *ga.evaluator().weights();

    let first = ga.optimize(&snap);
    let after = *ga.evaluator().weights();
    assert_ne!(before, after);
    assert!((after.sum() - 1.0).abs() < 1e-9);
    let steps = first.stats["reweights"].as_u64().unwrap() as usize;
    let generations = first.stats["generations"].as_u64().unwrap() as usize;
    assert_eq!(steps, generations + 1);
    assert_eq!(ga.evaluator().history().count(), steps.min(history_len));
    // the reported weights are the ones the next run starts from
    assert_eq!(first.metrics.weights, Some(after));
    let next = &first.stats["nextWeights"];
    for (key, value) in [
        ("workload", after.workload),
        ("pairing", after.pairing),
        ("schedule", after.schedule),
        ("diversity", after.diversity),
        ("timeSlot", after.time_slot),
        ("classroom", after.classroom),
    ] {
        let reported = next[key].as_f64().unwrap();
        assert!((reported - value).abs() < 1e-12, "{key}");
    }
    assert!(!ga.patterns().is_empty());

    let second = ga.optimize(&snap);
    assert_eq!(second.metrics.weights, Some(*ga.evaluator().weights()));
    assert_eq!(ga.evaluator().history().count(), history_len);
}

#[test]
fn frozen_weights_stay_at_baseline() {
    let snap = defense_snapshot(&[6, 4, 3, 2], 3, 12, 15);
    let mut cfg = config(5);
    cfg.genetic.generations = 3;
    cfg.genetic.population_size = 10;
    cfg.dynamic_weights.enabled = false;
    let mut ga = GeneticOptimizer::new(cfg).unwrap();
    let before = *ga.evaluator().weights();
    let res = ga.optimize(&snap);
    assert_eq!(res.stats["reweights"], 0);
    assert_eq!(*ga.evaluator().weights(), before);
    assert_eq!(ga.evaluator().history().count(), 0);
}

#[test]
fn every_project_placed_when_capacity_is_short() {
    let snap = defense_snapshot(&[5, 5, 5, 5], 2, 3, 10);
    let mut cfg = config(11);
    cfg.genetic.generations = 10;
    cfg.genetic.population_size = 20;
    let mut ga = GeneticOptimizer::new(cfg).unwrap();
    let res = ga.optimize(&snap);
    assert_eq!(res.assignments.len(), 10);
    assert!(res
        .violations
        .iter()
        .any(|v| v.r#type == "classroom_double_booking"));
}

#[test]
fn empty_snapshot_yields_no_solution() {
    let mut snap = defense_snapshot(&[3, 2], 1, 4, 2);
    snap.classrooms.clear();
    let mut ga = GeneticOptimizer::new(config(1)).unwrap();
    let res = ga.optimize(&snap);
    assert_eq!(res.status, SolveStatus::NoSolution);
    assert!(res.assignments.is_empty());
}

#[test]
fn invalid_config_is_rejected_before_search() {
    let mut cfg = config(1);
    cfg.genetic.tournament_size = 0;
    assert!(GeneticOptimizer::new(cfg).is_err());

    let mut cfg = config(1);
    cfg.genetic.crossover_min = 0.9;
    cfg.genetic.crossover_max = 0.6;
    assert!(GeneticOptimizer::new(cfg).is_err());
}

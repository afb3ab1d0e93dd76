use std::collections::{BTreeMap, HashMap, HashSet};
use types::{Assignment, ProjectKind, SubScores};

use crate::prep::{Placed, Prep};

/// Counts of soft-constraint violations in one solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViolationCounts {
    pub instructor_double_bookings: usize,
    pub classroom_double_bookings: usize,
    pub unavailable: usize,
    pub jury_size: usize,
    pub supervisor_shortfall: usize,
    pub missing_projects: usize,
    pub duplicate_projects: usize,
    pub responsible_mismatch: usize,
}

impl ViolationCounts {
    pub fn total(&self) -> usize {
        self.instructor_double_bookings
            + self.classroom_double_bookings
            + self.unavailable
            + self.jury_size
            + self.supervisor_shortfall
            + self.missing_projects
            + self.duplicate_projects
            + self.responsible_mismatch
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scores {
    pub sub: SubScores,
    pub violations: ViolationCounts,
    /// Panel appearances per instructor position.
    pub appearances: Vec<usize>,
}

/// Scores a solution. Returns `None` for malformed input: no assignments, an
/// unknown project/classroom/slot/panel member, or an empty panel.
pub fn compute_scores(
    prep: &Prep,
    assignments: &[Assignment],
    final_min_supervisors: usize,
) -> Option<Scores> {
    if assignments.is_empty() {
        return None;
    }
    let placed = assignments
        .iter()
        .map(|a| prep.decode(a))
        .collect::<Option<Vec<Placed>>>()?;

    let n_instr = prep.n_instructors();
    let mut appearances = vec![0usize; n_instr];
    for p in &placed {
        for &i in &p.panel {
            appearances[i] += 1;
        }
    }

    let sub = SubScores {
        workload: workload_score(&appearances),
        pairing: pairing_score(&placed, &appearances),
        schedule: compactness_score(prep, &placed),
        diversity: diversity_score(prep, &placed, &appearances),
        time_slot: time_slot_score(prep, &placed),
        classroom: classroom_score(prep, &placed),
    };
    let violations = count_violations(prep, &placed, final_min_supervisors);

    Some(Scores {
        sub,
        violations,
        appearances,
    })
}

pub(crate) fn mean_std(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn balance(counts: &[usize]) -> f64 {
    let xs: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let (_, sd) = mean_std(&xs);
    1.0 / (1.0 + sd)
}

/// `1 / (1 + cv)`; scale-free, 1.0 for an empty or all-zero vector.
fn relative_balance(counts: &[usize]) -> f64 {
    let xs: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let (mean, sd) = mean_std(&xs);
    if mean <= 0.0 {
        return 1.0;
    }
    1.0 / (1.0 + sd / mean)
}

fn workload_score(appearances: &[usize]) -> f64 {
    if appearances.is_empty() {
        return 0.0;
    }
    balance(appearances)
}

fn pairing_score(placed: &[Placed], appearances: &[usize]) -> f64 {
    let sims: Vec<f64> = placed
        .iter()
        .filter(|p| p.panel.len() >= 2)
        .map(|p| {
            let ca = appearances[p.panel[0]] as f64;
            let cb = appearances[p.panel[1]] as f64;
            1.0 - (ca - cb).abs() / ca.max(cb).max(1.0)
        })
        .collect();
    if sims.is_empty() {
        return 0.0;
    }
    sims.iter().sum::<f64>() / sims.len() as f64
}

fn compactness_score(prep: &Prep, placed: &[Placed]) -> f64 {
    let ideal = placed.len() / 2;
    if ideal == 0 {
        return 1.0;
    }
    let mut by_pair: HashMap<(usize, usize), Vec<&Placed>> = HashMap::new();
    for p in placed.iter().filter(|p| p.panel.len() >= 2) {
        let (a, b) = (p.panel[0], p.panel[1]);
        by_pair.entry((a.min(b), a.max(b))).or_default().push(p);
    }

    let mut adjacent = 0usize;
    let mut swapped = 0usize;
    for list in by_pair.values_mut() {
        list.sort_by_key(|p| p.slot);
        let mut k = 0;
        while k + 1 < list.len() {
            let (cur, next) = (list[k], list[k + 1]);
            if prep.consecutive(cur.slot, next.slot) {
                adjacent += 1;
                if cur.panel[0] == next.panel[1] && cur.panel[1] == next.panel[0] {
                    swapped += 1;
                }
                k += 2;
            } else {
                k += 1;
            }
        }
    }

    let adjacency = (adjacent as f64 / ideal as f64).min(1.0);
    let swap_rate = if adjacent > 0 {
        swapped as f64 / adjacent as f64
    } else {
        0.0
    };
    0.5 * adjacency + 0.5 * swap_rate
}

fn diversity_score(prep: &Prep, placed: &[Placed], appearances: &[usize]) -> f64 {
    let n_instr = prep.n_instructors();
    let partner_breadth = if n_instr <= 1 {
        1.0
    } else {
        let mut partners: Vec<HashSet<usize>> = vec![HashSet::new(); n_instr];
        for p in placed {
            for &a in &p.panel {
                for &b in &p.panel {
                    if a != b {
                        partners[a].insert(b);
                    }
                }
            }
        }
        let active: Vec<f64> = (0..n_instr)
            .filter(|&i| appearances[i] > 0)
            .map(|i| partners[i].len() as f64 / (n_instr - 1) as f64)
            .collect();
        if active.is_empty() {
            0.0
        } else {
            active.iter().sum::<f64>() / active.len() as f64
        }
    };

    let tag_balance = if prep.tags.is_empty() {
        1.0
    } else {
        let mut counts: HashMap<&str, usize> = prep.tags.iter().map(|&t| (t, 0)).collect();
        for p in placed {
            for &i in &p.panel {
                for tag in &prep.instructor(i).expertise {
                    if let Some(c) = counts.get_mut(tag.as_str()) {
                        *c += 1;
                    }
                }
            }
        }
        let v: Vec<usize> = prep.tags.iter().map(|t| counts[t]).collect();
        relative_balance(&v)
    };

    0.7 * partner_breadth + 0.3 * tag_balance
}

fn time_slot_score(prep: &Prep, placed: &[Placed]) -> f64 {
    let mut usage = vec![0usize; prep.n_slots()];
    for p in placed {
        usage[p.slot] += 1;
    }
    let used: Vec<usize> = usage.into_iter().filter(|&c| c > 0).collect();
    let denom = prep.n_slots().min(placed.len()).max(1);
    let fraction = (used.len() as f64 / denom as f64).min(1.0);
    0.5 * fraction + 0.5 * balance(&used)
}

fn classroom_score(prep: &Prep, placed: &[Placed]) -> f64 {
    let mut usage = vec![0usize; prep.n_classrooms()];
    let mut per_slot: BTreeMap<usize, (usize, HashSet<usize>)> = BTreeMap::new();
    for p in placed {
        usage[p.classroom] += 1;
        let e = per_slot.entry(p.slot).or_default();
        e.0 += 1;
        e.1.insert(p.classroom);
    }
    let used = usage.iter().filter(|&&c| c > 0).count();
    let denom = prep.n_classrooms().min(placed.len()).max(1);
    let fraction = (used as f64 / denom as f64).min(1.0);
    let spread = per_slot
        .values()
        .map(|(n, rooms)| rooms.len() as f64 / *n as f64)
        .sum::<f64>()
        / per_slot.len().max(1) as f64;
    (fraction + relative_balance(&usage) + spread) / 3.0
}

fn count_violations(prep: &Prep, placed: &[Placed], final_min_supervisors: usize) -> ViolationCounts {
    let mut v = ViolationCounts::default();
    let mut instr_slot: HashMap<(usize, usize), usize> = HashMap::new();
    let mut room_slot: HashMap<(usize, usize), usize> = HashMap::new();
    let mut per_project = vec![0usize; prep.n_projects()];

    for p in placed {
        per_project[p.project] += 1;
        *room_slot.entry((p.classroom, p.slot)).or_default() += 1;
        for &i in &p.panel {
            *instr_slot.entry((i, p.slot)).or_default() += 1;
            if !prep.available(i, p.slot) {
                v.unavailable += 1;
            }
        }

        let project = &prep.snap.projects[p.project];
        if p.panel.len() != project.panel_size() {
            v.jury_size += 1;
        }
        let owner = prep.project_owner[p.project];
        let owner_on_panel = owner.is_some_and(|o| p.panel.contains(&o));
        if p.responsible != owner || !owner_on_panel {
            v.responsible_mismatch += 1;
        }
        let required = match project.kind {
            ProjectKind::Final => final_min_supervisors,
            ProjectKind::Interim => final_min_supervisors.min(1),
        };
        let supervisors = p
            .panel
            .iter()
            .filter(|&&i| prep.instructor(i).can_supervise())
            .count();
        v.supervisor_shortfall += required.saturating_sub(supervisors);
    }

    v.instructor_double_bookings = instr_slot.values().map(|&n| n.saturating_sub(1)).sum();
    v.classroom_double_bookings = room_slot.values().map(|&n| n.saturating_sub(1)).sum();
    v.missing_projects = per_project.iter().filter(|&&n| n == 0).count();
    v.duplicate_projects = per_project.iter().map(|&n| n.saturating_sub(1)).sum();
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prep::fixtures::snapshot;
    use types::Assignment;

    fn asg(p: &str, c: &str, t: &str, jury: &[&str]) -> Assignment {
        Assignment {
            project_id: p.into(),
            classroom_id: c.into(),
            time_slot_id: t.into(),
            responsible_id: jury[0].into(),
            jury: jury.iter().map(|&j| j.into()).collect(),
        }
    }

    #[test]
    fn malformed_solutions_have_no_score() {
        let snap = snapshot(2, 2, 1, 2);
        let prep = Prep::new(&snap);
        assert!(compute_scores(&prep, &[], 2).is_none());
        let bad = asg("p0", "c9", "t0", &["i0", "i1"]);
        assert!(compute_scores(&prep, &[bad], 2).is_none());
        let mut empty_panel = asg("p0", "c0", "t0", &["i0"]);
        empty_panel.jury.clear();
        assert!(compute_scores(&prep, &[empty_panel], 2).is_none());
    }

    #[test]
    fn swapped_consecutive_pair_is_compact() {
        let snap = snapshot(2, 2, 1, 4);
        let prep = Prep::new(&snap);
        let sol = vec![
            asg("p0", "c0", "t0", &["i0", "i1"]),
            asg("p1", "c0", "t1", &["i1", "i0"]),
        ];
        let s = compute_scores(&prep, &sol, 1).unwrap();
        assert!((s.sub.schedule - 1.0).abs() < 1e-12);
        assert!((s.sub.workload - 1.0).abs() < 1e-12);
        assert!((s.sub.pairing - 1.0).abs() < 1e-12);
        assert_eq!(s.violations.total(), 0);

        let apart = vec![
            asg("p0", "c0", "t0", &["i0", "i1"]),
            asg("p1", "c0", "t3", &["i1", "i0"]),
        ];
        let s2 = compute_scores(&prep, &apart, 1).unwrap();
        assert!(s2.sub.schedule < s.sub.schedule);
    }

    #[test]
    fn double_bookings_are_counted_not_rejected() {
        let snap = snapshot(3, 3, 1, 2);
        let prep = Prep::new(&snap);
        let sol = vec![
            asg("p0", "c0", "t0", &["i0", "i1"]),
            asg("p1", "c0", "t0", &["i1", "i2"]),
        ];
        let s = compute_scores(&prep, &sol, 1).unwrap();
        assert_eq!(s.violations.instructor_double_bookings, 1);
        assert_eq!(s.violations.classroom_double_bookings, 1);
        assert_eq!(s.violations.missing_projects, 1);
    }

    #[test]
    fn sub_scores_stay_in_unit_range() {
        let snap = snapshot(4, 6, 2, 6);
        let prep = Prep::new(&snap);
        let sol = vec![
            asg("p0", "c0", "t0", &["i0", "i1"]),
            asg("p1", "c1", "t0", &["i1", "i2"]),
            asg("p2", "c0", "t2", &["i2", "i0"]),
            asg("p3", "c0", "t5", &["i3", "i0"]),
        ];
        let s = compute_scores(&prep, &sol, 2).unwrap();
        for m in types::Metric::ALL {
            let v = s.sub.get(m);
            assert!((0.0..=1.0).contains(&v), "{m} = {v}");
        }
    }
}

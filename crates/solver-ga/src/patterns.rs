use std::collections::HashSet;
use types::{Assignment, ClassroomId, InstructorId};

type Key = (InstructorId, InstructorId, ClassroomId);

/// (instructor pair, classroom) combinations seen in strong solutions.
/// Grows up to `capacity` and never forgets, so a solution's bonus can only
/// rise over the lifetime of an optimizer.
#[derive(Clone, Debug, Default)]
pub struct PatternMemory {
    seen: HashSet<Key>,
    capacity: usize,
}

fn key(a: &Assignment) -> Option<Key> {
    let (x, y) = (a.jury.first()?, a.jury.get(1)?);
    let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
    Some((lo.clone(), hi.clone(), a.classroom_id.clone()))
}

impl PatternMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Returns how many new patterns were stored.
    pub fn learn(&mut self, assignments: &[Assignment]) -> usize {
        let mut added = 0;
        for k in assignments.iter().filter_map(key) {
            if self.seen.len() >= self.capacity {
                break;
            }
            if self.seen.insert(k) {
                added += 1;
            }
        }
        added
    }

    /// `scale * matched / n`; at most `scale`.
    pub fn bonus(&self, assignments: &[Assignment], scale: f64) -> f64 {
        if assignments.is_empty() || self.seen.is_empty() || scale <= 0.0 {
            return 0.0;
        }
        let matched = assignments
            .iter()
            .filter_map(key)
            .filter(|k| self.seen.contains(k))
            .count();
        scale * matched as f64 / assignments.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asg(room: &str, a: &str, b: &str) -> Assignment {
        Assignment {
            project_id: "p".into(),
            classroom_id: room.into(),
            time_slot_id: "t".into(),
            responsible_id: a.into(),
            jury: vec![a.into(), b.into()],
        }
    }

    #[test]
    fn pair_order_does_not_matter() {
        let mut m = PatternMemory::new(10);
        assert_eq!(m.learn(&[asg("c0", "i0", "i1")]), 1);
        assert_eq!(m.learn(&[asg("c0", "i1", "i0")]), 0);
        let b = m.bonus(&[asg("c0", "i1", "i0"), asg("c1", "i1", "i0")], 0.02);
        assert!((b - 0.01).abs() < 1e-12);
    }

    #[test]
    fn capacity_bounds_growth() {
        let mut m = PatternMemory::new(2);
        m.learn(&[asg("c0", "a", "b"), asg("c1", "a", "b"), asg("c2", "a", "b")]);
        assert_eq!(m.len(), 2);
    }
}

use rand::seq::SliceRandom;
use rand::Rng;
use types::Assignment;

use crate::prep::Prep;

/// A single structural change to a solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Move {
    /// Exchange the time slots of two assignments.
    SwapSlots(usize, usize),
    ChangeSlot { at: usize, slot: usize },
    ChangeClassroom { at: usize, classroom: usize },
    /// Exchange panel positions 0 and 1.
    SwapRoles(usize),
    /// Replace the panel member at `pos` (never the responsible instructor).
    ReplaceJury { at: usize, pos: usize, with: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    SwapSlots,
    ChangeSlot,
    ChangeClassroom,
    SwapRoles,
    ReplaceJury,
}

impl MoveKind {
    pub const ALL: [Self; 5] = [
        Self::SwapSlots,
        Self::ChangeSlot,
        Self::ChangeClassroom,
        Self::SwapRoles,
        Self::ReplaceJury,
    ];
    /// The kinds used by plain mutation: relocate in time or space.
    pub const RELOCATE: [Self; 2] = [Self::ChangeSlot, Self::ChangeClassroom];
}

/// Draws a move of one of `kinds`. Returns `None` when the drawn kind has no
/// applicable instance (for example a swap on a single assignment).
pub fn random_move<R: Rng>(
    prep: &Prep,
    sol: &[Assignment],
    kinds: &[MoveKind],
    rng: &mut R,
) -> Option<Move> {
    if sol.is_empty() {
        return None;
    }
    let at = rng.gen_range(0..sol.len());
    match kinds.choose(rng)? {
        MoveKind::SwapSlots => {
            if sol.len() < 2 {
                return None;
            }
            let other = rng.gen_range(0..sol.len() - 1);
            let other = if other >= at { other + 1 } else { other };
            Some(Move::SwapSlots(at, other))
        }
        MoveKind::ChangeSlot => {
            if prep.n_slots() == 0 {
                return None;
            }
            Some(Move::ChangeSlot {
                at,
                slot: rng.gen_range(0..prep.n_slots()),
            })
        }
        MoveKind::ChangeClassroom => {
            if prep.n_classrooms() == 0 {
                return None;
            }
            Some(Move::ChangeClassroom {
                at,
                classroom: rng.gen_range(0..prep.n_classrooms()),
            })
        }
        MoveKind::SwapRoles => (sol[at].jury.len() >= 2).then_some(Move::SwapRoles(at)),
        MoveKind::ReplaceJury => {
            let a = &sol[at];
            let positions: Vec<usize> = (0..a.jury.len())
                .filter(|&p| a.jury[p] != a.responsible_id)
                .collect();
            let pos = *positions.choose(rng)?;
            let outsiders: Vec<usize> = (0..prep.n_instructors())
                .filter(|&i| !a.jury.contains(&prep.instructor(i).id))
                .collect();
            let with = *outsiders.choose(rng)?;
            Some(Move::ReplaceJury { at, pos, with })
        }
    }
}

pub fn apply(prep: &Prep, sol: &mut [Assignment], mv: &Move) {
    match *mv {
        Move::SwapSlots(a, b) => {
            let slot_a = sol[a].time_slot_id.clone();
            sol[a].time_slot_id = std::mem::replace(&mut sol[b].time_slot_id, slot_a);
        }
        Move::ChangeSlot { at, slot } => {
            sol[at].time_slot_id = prep.snap.time_slots[slot].id.clone();
        }
        Move::ChangeClassroom { at, classroom } => {
            sol[at].classroom_id = prep.snap.classrooms[classroom].id.clone();
        }
        Move::SwapRoles(at) => sol[at].jury.swap(0, 1),
        Move::ReplaceJury { at, pos, with } => {
            sol[at].jury[pos] = prep.instructor(with).id.clone();
        }
    }
}

/// Draws and applies one move; returns whether anything changed.
pub fn perturb<R: Rng>(prep: &Prep, sol: &mut [Assignment], kinds: &[MoveKind], rng: &mut R) -> bool {
    for _ in 0..4 {
        if let Some(mv) = random_move(prep, sol, kinds, rng) {
            apply(prep, sol, &mv);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prep::fixtures::snapshot;
    use crate::rng::rng_from_seed;

    fn sample() -> Vec<Assignment> {
        vec![
            Assignment {
                project_id: "p0".into(),
                classroom_id: "c0".into(),
                time_slot_id: "t0".into(),
                responsible_id: "i0".into(),
                jury: vec!["i0".into(), "i1".into()],
            },
            Assignment {
                project_id: "p1".into(),
                classroom_id: "c1".into(),
                time_slot_id: "t3".into(),
                responsible_id: "i1".into(),
                jury: vec!["i1".into(), "i2".into()],
            },
        ]
    }

    #[test]
    fn swap_slots_exchanges_only_slots() {
        let snap = snapshot(3, 2, 2, 4);
        let prep = Prep::new(&snap);
        let mut sol = sample();
        apply(&prep, &mut sol, &Move::SwapSlots(0, 1));
        assert_eq!(sol[0].time_slot_id.0, "t3");
        assert_eq!(sol[1].time_slot_id.0, "t0");
        assert_eq!(sol[0].classroom_id.0, "c0");
    }

    #[test]
    fn replace_jury_keeps_responsible() {
        let snap = snapshot(4, 2, 2, 4);
        let prep = Prep::new(&snap);
        let mut rng = rng_from_seed(11);
        for _ in 0..50 {
            let mut sol = sample();
            if let Some(mv) = random_move(&prep, &sol, &[MoveKind::ReplaceJury], &mut rng) {
                apply(&prep, &mut sol, &mv);
                assert_eq!(sol[0].jury[0].0, "i0");
                assert_eq!(sol[1].jury[0].0, "i1");
            }
        }
    }

    #[test]
    fn relocation_moves_keep_length() {
        let snap = snapshot(3, 2, 2, 4);
        let prep = Prep::new(&snap);
        let mut rng = rng_from_seed(2);
        let mut sol = sample();
        for _ in 0..20 {
            perturb(&prep, &mut sol, &MoveKind::ALL, &mut rng);
            assert_eq!(sol.len(), 2);
            assert!(prep.decode(&sol[0]).is_some());
        }
    }
}

use sched_core::Prep;
use tracing::{debug, info};
use types::{
    Assignment, ClassroomId, Conflict, ConflictKind, InstructorId, ResolutionEntry,
    ResolutionReport, ResolutionStrategy, Snapshot, TimeSlotId,
};

use crate::detect::detect;

/// Working view over the assignment list being repaired.
struct Board<'a> {
    prep: Prep<'a>,
    work: Vec<Assignment>,
}

impl<'a> Board<'a> {
    fn instructor_busy(&self, skip: usize, who: &InstructorId, slot: &TimeSlotId) -> bool {
        self.work
            .iter()
            .enumerate()
            .any(|(j, a)| j != skip && &a.time_slot_id == slot && a.jury.contains(who))
    }

    fn room_busy(&self, skip: usize, room: &ClassroomId, slot: &TimeSlotId) -> bool {
        self.work
            .iter()
            .enumerate()
            .any(|(j, a)| j != skip && &a.time_slot_id == slot && &a.classroom_id == room)
    }

    fn slot_load(&self, skip: usize, slot: &TimeSlotId) -> usize {
        self.work
            .iter()
            .enumerate()
            .filter(|&(j, a)| j != skip && &a.time_slot_id == slot)
            .count()
    }

    fn available(&self, who: &InstructorId, slot: usize) -> bool {
        self.prep
            .idx_instructor
            .get(who.0.as_str())
            .is_some_and(|&i| self.prep.available(i, slot))
    }

    /// Whether assignment `idx` still takes part in conflict `c`.
    fn still_conflicting(&self, idx: usize, c: &Conflict) -> bool {
        let a = &self.work[idx];
        if a.time_slot_id != c.time_slot_id {
            return false;
        }
        match c.kind {
            ConflictKind::InstructorDoubleBooked => c.instructor_id.as_ref().is_some_and(|who| {
                a.jury.contains(who) && self.instructor_busy(idx, who, &a.time_slot_id)
            }),
            ConflictKind::ClassroomDoubleBooked => {
                c.classroom_id.as_ref() == Some(&a.classroom_id)
                    && self.room_busy(idx, &a.classroom_id, &a.time_slot_id)
            }
            ConflictKind::TimeSlotOverloaded => {
                self.slot_load(idx, &a.time_slot_id) >= self.prep.n_classrooms()
            }
        }
    }

    /// Nearest slot where the whole panel is available and free and a
    /// classroom is free; the current classroom is kept when possible.
    fn reschedule(&mut self, idx: usize) -> Option<String> {
        let a = &self.work[idx];
        let here = self.prep.idx_slot.get(a.time_slot_id.0.as_str()).copied();
        let origin = here.unwrap_or(0);
        let mut order: Vec<usize> = (0..self.prep.n_slots()).filter(|&t| Some(t) != here).collect();
        order.sort_by_key(|&t| (t.abs_diff(origin), t));

        for t in order {
            let slot = &self.prep.snap.time_slots[t].id;
            if self.slot_load(idx, slot) >= self.prep.n_classrooms() {
                continue;
            }
            let panel_ok = a
                .jury
                .iter()
                .all(|m| self.available(m, t) && !self.instructor_busy(idx, m, slot));
            if !panel_ok {
                continue;
            }
            let room = if !self.room_busy(idx, &a.classroom_id, slot) {
                Some(a.classroom_id.clone())
            } else {
                self.prep
                    .snap
                    .classrooms
                    .iter()
                    .map(|c| &c.id)
                    .find(|c| !self.room_busy(idx, c, slot))
                    .cloned()
            };
            let Some(room) = room else { continue };
            let slot = slot.clone();
            let description = format!(
                "moved {} from {}/{} to {}/{}",
                a.project_id, a.time_slot_id, a.classroom_id, slot, room
            );
            let a = &mut self.work[idx];
            a.time_slot_id = slot;
            a.classroom_id = room;
            return Some(description);
        }
        None
    }

    /// Swaps the double-booked jury member for the least loaded free one.
    /// The responsible instructor is never replaced.
    fn replace_jury(&mut self, idx: usize, who: &InstructorId) -> Option<String> {
        let a = &self.work[idx];
        if &a.responsible_id == who {
            return None;
        }
        let pos = a.jury.iter().position(|m| m == who)?;
        let slot = self.prep.idx_slot.get(a.time_slot_id.0.as_str()).copied()?;

        let appearances = |id: &InstructorId| self.work.iter().filter(|x| x.jury.contains(id)).count();
        let substitute = self
            .prep
            .snap
            .instructors
            .iter()
            .filter(|t| !a.jury.contains(&t.id))
            .filter(|t| t.is_available(slot) && !self.instructor_busy(idx, &t.id, &a.time_slot_id))
            .min_by_key(|t| (appearances(&t.id), t.load, t.id.clone()))?
            .id
            .clone();

        let description = format!(
            "replaced {} with {} on the panel of {}",
            who, substitute, a.project_id
        );
        self.work[idx].jury[pos] = substitute;
        Some(description)
    }

    fn relocate(&mut self, idx: usize) -> Option<String> {
        let a = &self.work[idx];
        let room = self
            .prep
            .snap
            .classrooms
            .iter()
            .map(|c| &c.id)
            .find(|c| **c != a.classroom_id && !self.room_busy(idx, c, &a.time_slot_id))?
            .clone();
        let description = format!(
            "moved {} from {} to {} in {}",
            a.project_id, a.classroom_id, room, a.time_slot_id
        );
        self.work[idx].classroom_id = room;
        Some(description)
    }

    /// Applies the first strategy that works for `idx`.
    fn repair(&mut self, idx: usize, c: &Conflict) -> Option<(ResolutionStrategy, String)> {
        if let Some(d) = self.reschedule(idx) {
            return Some((ResolutionStrategy::Reschedule, d));
        }
        if let (ConflictKind::InstructorDoubleBooked, Some(who)) = (c.kind, &c.instructor_id) {
            if let Some(d) = self.replace_jury(idx, who) {
                return Some((ResolutionStrategy::ReplaceJury, d));
            }
        }
        if c.kind == ConflictKind::ClassroomDoubleBooked {
            if let Some(d) = self.relocate(idx) {
                return Some((ResolutionStrategy::RelocateClassroom, d));
            }
        }
        None
    }
}

/// Detects conflicts and repairs them in place where possible.
///
/// Within each conflict the first affected assignment keeps its place; each
/// other one is rescheduled, gets a replacement jury member (instructor
/// conflicts), or moves to a free classroom (classroom conflicts), in that
/// order. When none of them can be repaired the first assignment is tried
/// the same way. A failed repair leaves the assignment untouched and no
/// assignment is ever removed.
pub fn resolve(snapshot: &Snapshot, assignments: &[Assignment]) -> ResolutionReport {
    let conflicts = detect(snapshot, assignments);
    let mut board = Board {
        prep: Prep::new(snapshot),
        work: assignments.to_vec(),
    };
    let mut log = Vec::with_capacity(conflicts.len());

    for (ci, c) in conflicts.iter().enumerate() {
        let mut strategy = None;
        let mut changes = Vec::new();
        let mut stuck = Vec::new();
        for &idx in c.assignments.iter().skip(1) {
            if !board.still_conflicting(idx, c) {
                continue;
            }
            match board.repair(idx, c) {
                Some((s, d)) => {
                    debug!(conflict = ci, assignment = idx, strategy = ?s, change = %d, "repaired");
                    strategy.get_or_insert(s);
                    changes.push(d);
                }
                None => {
                    debug!(conflict = ci, assignment = idx, kind = ?c.kind, "no repair found");
                    stuck.push(idx);
                }
            }
        }
        // the kept assignment moves only when the others cannot
        match c.assignments.first() {
            Some(&head) if !stuck.is_empty() && board.still_conflicting(head, c) => {
                if let Some((s, d)) = board.repair(head, c) {
                    debug!(conflict = ci, assignment = head, strategy = ?s, change = %d, "repaired");
                    strategy.get_or_insert(s);
                    changes.push(d);
                }
            }
            _ => {}
        }
        let mut success = true;
        for idx in stuck {
            if board.still_conflicting(idx, c) {
                success = false;
                changes.push(format!(
                    "left {} in {} unchanged",
                    board.work[idx].project_id, board.work[idx].time_slot_id
                ));
            }
        }
        let description = if changes.is_empty() {
            "resolved by earlier repairs".to_string()
        } else {
            changes.join("; ")
        };
        log.push(ResolutionEntry {
            conflict: ci,
            success,
            strategy,
            description,
        });
    }

    let remaining = detect(snapshot, &board.work).len();
    info!(
        detected = conflicts.len(),
        remaining,
        "conflict resolution finished"
    );
    ResolutionReport {
        assignments: board.work,
        conflicts,
        log,
        remaining,
    }
}

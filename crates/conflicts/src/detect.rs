use std::collections::BTreeMap;
use types::{
    Assignment, ClassroomId, Conflict, ConflictKind, InstructorId, ResolutionStrategy, Severity,
    Snapshot, TimeSlotId,
};

fn push_unique(list: &mut Vec<usize>, idx: usize) {
    if list.last() != Some(&idx) {
        list.push(idx);
    }
}

/// Scans a committed assignment list for double bookings and overloaded slots.
///
/// One record per offending group. Instructor conflicts come first, then
/// classroom conflicts, then slot overloads; each group is ordered by slot id
/// and resource id. Ids unknown to the snapshot are still compared as-is.
pub fn detect(snapshot: &Snapshot, assignments: &[Assignment]) -> Vec<Conflict> {
    let mut by_instructor: BTreeMap<(&TimeSlotId, &InstructorId), Vec<usize>> = BTreeMap::new();
    let mut by_classroom: BTreeMap<(&TimeSlotId, &ClassroomId), Vec<usize>> = BTreeMap::new();
    let mut by_slot: BTreeMap<&TimeSlotId, Vec<usize>> = BTreeMap::new();

    for (idx, a) in assignments.iter().enumerate() {
        for member in &a.jury {
            push_unique(by_instructor.entry((&a.time_slot_id, member)).or_default(), idx);
        }
        by_classroom
            .entry((&a.time_slot_id, &a.classroom_id))
            .or_default()
            .push(idx);
        by_slot.entry(&a.time_slot_id).or_default().push(idx);
    }

    let mut out = Vec::new();
    for ((slot, instructor), idxs) in by_instructor {
        if idxs.len() > 1 {
            out.push(Conflict {
                kind: ConflictKind::InstructorDoubleBooked,
                instructor_id: Some(instructor.clone()),
                classroom_id: None,
                time_slot_id: slot.clone(),
                severity: Severity::from_overlap(idxs.len()),
                suggested: ResolutionStrategy::Reschedule,
                assignments: idxs,
            });
        }
    }

    let rooms = snapshot.classrooms.len();
    for ((slot, classroom), idxs) in by_classroom {
        if idxs.len() > 1 {
            let used_in_slot = by_slot.get(slot).map_or(0, Vec::len);
            let suggested = if used_in_slot < rooms {
                ResolutionStrategy::RelocateClassroom
            } else {
                ResolutionStrategy::Reschedule
            };
            out.push(Conflict {
                kind: ConflictKind::ClassroomDoubleBooked,
                instructor_id: None,
                classroom_id: Some(classroom.clone()),
                time_slot_id: slot.clone(),
                severity: Severity::from_overlap(idxs.len()),
                suggested,
                assignments: idxs,
            });
        }
    }

    for (slot, idxs) in by_slot {
        if idxs.len() > rooms {
            out.push(Conflict {
                kind: ConflictKind::TimeSlotOverloaded,
                instructor_id: None,
                classroom_id: None,
                time_slot_id: slot.clone(),
                severity: Severity::from_overlap(idxs.len() - rooms + 1),
                suggested: ResolutionStrategy::Reschedule,
                assignments: idxs,
            });
        }
    }
    out
}

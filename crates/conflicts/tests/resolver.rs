use conflict_resolver::{detect, resolve};
use types::*;

fn asg(p: &str, c: &str, t: &str, jury: &[&str]) -> Assignment {
    Assignment {
        project_id: p.into(),
        classroom_id: c.into(),
        time_slot_id: t.into(),
        responsible_id: jury[0].into(),
        jury: jury.iter().map(|&j| j.into()).collect(),
    }
}

fn campus(instructors: usize, rooms: usize, slots: usize) -> Snapshot {
    let instructors: Vec<Instructor> = (0..instructors)
        .map(|i| Instructor {
            id: format!("i{i}").as_str().into(),
            name: format!("Instructor {i}"),
            category: InstructorCategory::Supervisor,
            availability: vec![],
            load: 2,
            expertise: vec![],
            collaborations: Default::default(),
        })
        .collect();
    Snapshot {
        projects: (0..8)
            .map(|p| Project {
                id: format!("p{p}").as_str().into(),
                responsible: instructors[p % instructors.len()].id.clone(),
                jury_size: 1,
                kind: ProjectKind::Interim,
                topic: None,
                difficulty: None,
            })
            .collect(),
        instructors,
        classrooms: (0..rooms)
            .map(|c| Classroom {
                id: format!("c{c}").as_str().into(),
                name: format!("Room {c}"),
                capacity: 20,
                features: vec![],
            })
            .collect(),
        time_slots: (0..slots)
            .map(|t| TimeSlot {
                id: format!("t{t}").as_str().into(),
                start: format!("{:02}:00", 8 + t),
                end: format!("{:02}:40", 8 + t),
                day: 0,
            })
            .collect(),
    }
}

#[test]
fn detector_reports_the_double_booked_instructor() {
    let snap = campus(5, 3, 4);
    let sol = vec![
        asg("p0", "c0", "t1", &["i0", "i1"]),
        asg("p1", "c1", "t1", &["i2", "i1"]),
        asg("p2", "c0", "t2", &["i3", "i4"]),
    ];
    let found = detect(&snap, &sol);
    let instructor: Vec<&Conflict> = found
        .iter()
        .filter(|c| c.kind == ConflictKind::InstructorDoubleBooked)
        .collect();
    assert_eq!(instructor.len(), 1);
    assert_eq!(found.len(), 1);
    let c = instructor[0];
    assert_eq!(c.instructor_id, Some(InstructorId::from("i1")));
    assert_eq!(c.time_slot_id, TimeSlotId::from("t1"));
    assert_eq!(c.assignments, vec![0, 1]);
    assert_eq!(c.severity, Severity::Medium);
}

#[test]
fn resolution_keeps_every_assignment_and_leaves_bystanders_alone() {
    let snap = campus(6, 2, 4);
    let sol = vec![
        asg("p0", "c0", "t0", &["i0", "i1"]),
        asg("p1", "c1", "t0", &["i1", "i2"]),
        asg("p2", "c0", "t1", &["i3", "i4"]),
        asg("p3", "c0", "t2", &["i5", "i0"]),
        asg("p4", "c0", "t2", &["i2", "i3"]),
    ];
    let report = resolve(&snap, &sol);

    assert_eq!(report.assignments.len(), sol.len());
    assert_eq!(report.assignments[2], sol[2]);
    // first assignment of each conflict stays in place
    assert_eq!(report.assignments[0], sol[0]);
    assert_eq!(report.assignments[3], sol[3]);
    assert_eq!(report.remaining, 0);
    assert!(detect(&snap, &report.assignments).is_empty());
    assert_eq!(report.log.len(), report.conflicts.len());
    assert!(report.log.iter().all(|e| e.success));
}

#[test]
fn reschedule_prefers_the_nearest_slot_and_same_classroom() {
    let snap = campus(4, 2, 5);
    let sol = vec![
        asg("p0", "c1", "t2", &["i0", "i1"]),
        asg("p1", "c0", "t2", &["i1", "i2"]),
    ];
    let report = resolve(&snap, &sol);
    assert_eq!(report.log[0].strategy, Some(ResolutionStrategy::Reschedule));
    let moved = &report.assignments[1];
    assert_eq!(moved.time_slot_id, TimeSlotId::from("t1"));
    assert_eq!(moved.classroom_id, ClassroomId::from("c0"));
}

#[test]
fn unavailable_panel_blocks_rescheduling_and_classroom_moves_instead() {
    let mut snap = campus(4, 2, 2);
    // i2 and i3 can only sit in t0
    for i in [2, 3] {
        snap.instructors[i].availability = vec![true, false];
    }
    let sol = vec![
        asg("p0", "c0", "t0", &["i0", "i1"]),
        asg("p1", "c0", "t0", &["i2", "i3"]),
    ];
    let report = resolve(&snap, &sol);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].kind, ConflictKind::ClassroomDoubleBooked);
    assert_eq!(report.log[0].strategy, Some(ResolutionStrategy::RelocateClassroom));
    assert_eq!(report.assignments[1].classroom_id, ClassroomId::from("c1"));
    assert_eq!(report.assignments[1].time_slot_id, TimeSlotId::from("t0"));
    assert_eq!(report.remaining, 0);
}

#[test]
fn unresolvable_conflicts_are_counted_as_remaining() {
    let snap = campus(2, 1, 1);
    let sol = vec![
        asg("p0", "c0", "t0", &["i0", "i1"]),
        asg("p1", "c0", "t0", &["i1", "i0"]),
    ];
    let report = resolve(&snap, &sol);
    assert_eq!(report.assignments, sol);
    assert!(report.remaining > 0);
    assert_eq!(report.remaining, report.conflicts.len());
    assert!(report.log.iter().all(|e| !e.success));
}

#[test]
fn kept_assignment_loses_its_jury_member_when_the_other_cannot_move() {
    // one slot, and i0 leads p1, so only p0's panel can change
    let snap = campus(4, 2, 1);
    let sol = vec![
        asg("p0", "c0", "t0", &["i1", "i0"]),
        asg("p1", "c1", "t0", &["i0", "i2"]),
    ];
    let report = resolve(&snap, &sol);
    assert_eq!(report.remaining, 0);
    assert!(report.log[0].success);
    assert_eq!(report.log[0].strategy, Some(ResolutionStrategy::ReplaceJury));
    assert_eq!(report.assignments[1], sol[1]);
    assert_eq!(
        report.assignments[0].jury,
        vec![InstructorId::from("i1"), InstructorId::from("i3")]
    );
    assert_eq!(report.assignments[0].responsible_id, InstructorId::from("i1"));
}

#[test]
fn kept_assignment_is_rescheduled_when_the_other_panel_is_unavailable() {
    let mut snap = campus(4, 2, 2);
    snap.instructors[2].availability = vec![true, false];
    let sol = vec![
        asg("p0", "c0", "t0", &["i1", "i0"]),
        asg("p1", "c1", "t0", &["i0", "i2"]),
    ];
    let report = resolve(&snap, &sol);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.log[0].strategy, Some(ResolutionStrategy::Reschedule));
    assert_eq!(report.assignments[0].time_slot_id, TimeSlotId::from("t1"));
    assert_eq!(report.assignments[0].classroom_id, ClassroomId::from("c0"));
    assert_eq!(report.assignments[1], sol[1]);
    assert!(detect(&snap, &report.assignments).is_empty());
}

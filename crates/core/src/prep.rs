use std::collections::{HashMap, HashSet};
use types::{Assignment, Instructor, Snapshot};

/// An assignment resolved to snapshot positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placed {
    pub project: usize,
    pub classroom: usize,
    pub slot: usize,
    pub panel: Vec<usize>,
    pub responsible: Option<usize>,
}

/// Read-only index over a snapshot, built once per run and shared by workers.
pub struct Prep<'a> {
    pub snap: &'a Snapshot,
    pub idx_instructor: HashMap<&'a str, usize>,
    pub idx_project: HashMap<&'a str, usize>,
    pub idx_classroom: HashMap<&'a str, usize>,
    pub idx_slot: HashMap<&'a str, usize>,
    pub slot_day: Vec<u32>,
    /// Projects indexed by the position of their responsible instructor.
    pub owned: Vec<Vec<usize>>,
    pub project_owner: Vec<Option<usize>>,
    pub tags: Vec<&'a str>,
}

impl<'a> Prep<'a> {
    pub fn new(snap: &'a Snapshot) -> Self {
        let idx_instructor: HashMap<&str, usize> = snap
            .instructors
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.0.as_str(), i))
            .collect();
        let idx_project = snap
            .projects
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.0.as_str(), i))
            .collect();
        let idx_classroom = snap
            .classrooms
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.0.as_str(), i))
            .collect();
        let idx_slot = snap
            .time_slots
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.0.as_str(), i))
            .collect();
        let slot_day = snap.time_slots.iter().map(|t| t.day).collect();

        let mut owned = vec![Vec::new(); snap.instructors.len()];
        let mut project_owner = Vec::with_capacity(snap.projects.len());
        for (pi, p) in snap.projects.iter().enumerate() {
            let owner = idx_instructor.get(p.responsible.0.as_str()).copied();
            if let Some(o) = owner {
                owned[o].push(pi);
            }
            project_owner.push(owner);
        }

        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for t in &snap.instructors {
            for tag in &t.expertise {
                if seen.insert(tag.as_str()) {
                    tags.push(tag.as_str());
                }
            }
        }

        Self {
            snap,
            idx_instructor,
            idx_project,
            idx_classroom,
            idx_slot,
            slot_day,
            owned,
            project_owner,
            tags,
        }
    }

    pub fn n_instructors(&self) -> usize {
        self.snap.instructors.len()
    }

    pub fn n_projects(&self) -> usize {
        self.snap.projects.len()
    }

    pub fn n_classrooms(&self) -> usize {
        self.snap.classrooms.len()
    }

    pub fn n_slots(&self) -> usize {
        self.snap.time_slots.len()
    }

    pub fn instructor(&self, i: usize) -> &'a Instructor {
        &self.snap.instructors[i]
    }

    /// Adjacent positions on the same day.
    pub fn consecutive(&self, a: usize, b: usize) -> bool {
        b == a + 1 && b < self.slot_day.len() && self.slot_day[a] == self.slot_day[b]
    }

    pub fn available(&self, instructor: usize, slot: usize) -> bool {
        self.snap.instructors[instructor].is_available(slot)
    }

    pub fn base_loads(&self) -> Vec<u32> {
        self.snap.instructors.iter().map(|t| t.load).collect()
    }

    /// Resolves ids to positions; `None` when any required reference is unknown
    /// or the panel is empty.
    pub fn decode(&self, a: &Assignment) -> Option<Placed> {
        let project = *self.idx_project.get(a.project_id.0.as_str())?;
        let classroom = *self.idx_classroom.get(a.classroom_id.0.as_str())?;
        let slot = *self.idx_slot.get(a.time_slot_id.0.as_str())?;
        if a.jury.is_empty() {
            return None;
        }
        let panel = a
            .jury
            .iter()
            .map(|id| self.idx_instructor.get(id.0.as_str()).copied())
            .collect::<Option<Vec<_>>>()?;
        let responsible = self.idx_instructor.get(a.responsible_id.0.as_str()).copied();
        Some(Placed {
            project,
            classroom,
            slot,
            panel,
            responsible,
        })
    }

    pub fn encode(&self, p: &Placed) -> Assignment {
        let project = &self.snap.projects[p.project];
        Assignment {
            project_id: project.id.clone(),
            classroom_id: self.snap.classrooms[p.classroom].id.clone(),
            time_slot_id: self.snap.time_slots[p.slot].id.clone(),
            responsible_id: project.responsible.clone(),
            jury: p
                .panel
                .iter()
                .map(|&i| self.snap.instructors[i].id.clone())
                .collect(),
        }
    }

    pub fn collaborations(&self, a: usize, b: usize) -> u32 {
        let ia = &self.snap.instructors[a];
        let ib = &self.snap.instructors[b];
        ia.collaborations.get(&ib.id).copied().unwrap_or(0)
            + ib.collaborations.get(&ia.id).copied().unwrap_or(0)
    }

    pub fn shared_availability(&self, a: usize, b: usize) -> usize {
        (0..self.n_slots())
            .filter(|&t| self.available(a, t) && self.available(b, t))
            .count()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use types::*;

    pub fn instructor(id: &str, load: u32) -> Instructor {
        Instructor {
            id: id.into(),
            name: format!("Instructor {id}"),
            category: InstructorCategory::Supervisor,
            availability: vec![],
            load,
            expertise: vec![],
            collaborations: Default::default(),
        }
    }

    pub fn snapshot(instructors: usize, projects: usize, rooms: usize, slots: usize) -> Snapshot {
        let instructors: Vec<Instructor> = (0..instructors)
            .map(|i| instructor(&format!("i{i}"), (instructors - i) as u32))
            .collect();
        let projects = (0..projects)
            .map(|p| Project {
                id: format!("p{p}").as_str().into(),
                responsible: instructors[p % instructors.len()].id.clone(),
                jury_size: 1,
                kind: if p % 2 == 0 { ProjectKind::Interim } else { ProjectKind::Final },
                topic: None,
                difficulty: None,
            })
            .collect();
        let classrooms = (0..rooms)
            .map(|c| Classroom {
                id: format!("c{c}").as_str().into(),
                name: format!("Room {c}"),
                capacity: 30,
                features: vec![],
            })
            .collect();
        let time_slots = (0..slots)
            .map(|t| TimeSlot {
                id: format!("t{t}").as_str().into(),
                start: format!("{:02}:00", 8 + t % 10),
                end: format!("{:02}:30", 8 + t % 10),
                day: (t / 10) as u32,
            })
            .collect();
        Snapshot {
            instructors,
            projects,
            classrooms,
            time_slots,
        }
    }
}

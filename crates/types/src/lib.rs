pub mod config;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use config::{
    AnnealingParams, BuilderConfig, DynamicWeights, GeneticParams, OptimizerConfig,
    PenaltyWeights, SeedMode,
};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(InstructorId);
id_newtype!(ProjectId);
id_newtype!(ClassroomId);
id_newtype!(TimeSlotId);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstructorCategory {
    #[default]
    Supervisor,
    Assistant,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    #[default]
    Interim,
    Final,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: InstructorId,
    pub name: String,
    #[serde(default)]
    pub category: InstructorCategory,
    /// Indexed by time-slot position. Empty means available everywhere.
    #[serde(default)]
    pub availability: Vec<bool>,
    #[serde(default)]
    pub load: u32,
    #[serde(default)]
    pub expertise: Vec<String>,
    /// Past collaboration counts keyed by the other instructor.
    #[serde(default)]
    pub collaborations: HashMap<InstructorId, u32>,
}

impl Instructor {
    pub fn is_available(&self, slot: usize) -> bool {
        self.availability.get(slot).copied().unwrap_or(true)
    }

    pub fn can_supervise(&self) -> bool {
        self.category == InstructorCategory::Supervisor
    }
}

fn default_jury_size() -> u8 {
    2
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub responsible: InstructorId,
    /// Jury members required in addition to the responsible instructor.
    #[serde(default = "default_jury_size")]
    pub jury_size: u8,
    #[serde(default)]
    pub kind: ProjectKind,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

impl Project {
    pub fn panel_size(&self) -> usize {
        1 + self.jury_size as usize
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub day: u32,
}

impl TimeSlot {
    /// Minutes since midnight for `start` and `end`, if both parse as `HH:MM`.
    pub fn minutes(&self) -> Option<(u32, u32)> {
        Some((parse_clock(&self.start)?, parse_clock(&self.end)?))
    }

    pub fn is_valid_format(&self) -> bool {
        matches!(self.minutes(), Some((s, e)) if s < e)
    }
}

fn parse_clock(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

/// Read-only input of one optimization run.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.instructors.is_empty()
            || self.projects.is_empty()
            || self.classrooms.is_empty()
            || self.time_slots.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub project_id: ProjectId,
    pub classroom_id: ClassroomId,
    pub time_slot_id: TimeSlotId,
    pub responsible_id: InstructorId,
    /// Ordered panel: position 0 holds the supervisor role for this slot.
    pub jury: Vec<InstructorId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct Solution {
    pub assignments: Vec<Assignment>,
}

impl Solution {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Order-insensitive fingerprint of the assignments.
    pub fn signature(&self) -> u64 {
        let mut keys: Vec<&Assignment> = self.assignments.iter().collect();
        keys.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        let mut h = DefaultHasher::new();
        for a in keys {
            a.hash(&mut h);
        }
        h.finish()
    }
}

/// Sub-score dimensions of the fitness function.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Workload,
    Pairing,
    Schedule,
    Diversity,
    TimeSlot,
    Classroom,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Workload,
        Metric::Pairing,
        Metric::Schedule,
        Metric::Diversity,
        Metric::TimeSlot,
        Metric::Classroom,
    ];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Metric::Workload => "workload",
            Metric::Pairing => "pairing",
            Metric::Schedule => "schedule",
            Metric::Diversity => "diversity",
            Metric::TimeSlot => "time_slot",
            Metric::Classroom => "classroom",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FitnessWeights {
    pub workload: f64,
    pub pairing: f64,
    pub schedule: f64,
    pub diversity: f64,
    pub time_slot: f64,
    pub classroom: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            workload: 0.25,
            pairing: 0.15,
            schedule: 0.2,
            diversity: 0.1,
            time_slot: 0.1,
            classroom: 0.2,
        }
    }
}

impl FitnessWeights {
    pub fn get(&self, m: Metric) -> f64 {
        match m {
            Metric::Workload => self.workload,
            Metric::Pairing => self.pairing,
            Metric::Schedule => self.schedule,
            Metric::Diversity => self.diversity,
            Metric::TimeSlot => self.time_slot,
            Metric::Classroom => self.classroom,
        }
    }

    pub fn set(&mut self, m: Metric, v: f64) {
        let slot = match m {
            Metric::Workload => &mut self.workload,
            Metric::Pairing => &mut self.pairing,
            Metric::Schedule => &mut self.schedule,
            Metric::Diversity => &mut self.diversity,
            Metric::TimeSlot => &mut self.time_slot,
            Metric::Classroom => &mut self.classroom,
        };
        *slot = v;
    }

    pub fn sum(&self) -> f64 {
        Metric::ALL.iter().map(|&m| self.get(m)).sum()
    }

    /// Rescales to sum 1.0; falls back to uniform weights when the sum is not positive.
    pub fn normalize(&mut self) {
        let total = self.sum();
        if !(total.is_finite() && total > 0.0) {
            let even = 1.0 / Metric::ALL.len() as f64;
            for m in Metric::ALL {
                self.set(m, even);
            }
            return;
        }
        for m in Metric::ALL {
            self.set(m, self.get(m) / total);
        }
    }
}

/// Sub-scores in `[0, 1]`, higher is better.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    pub workload: f64,
    pub pairing: f64,
    pub schedule: f64,
    pub diversity: f64,
    pub time_slot: f64,
    pub classroom: f64,
}

impl SubScores {
    pub fn get(&self, m: Metric) -> f64 {
        match m {
            Metric::Workload => self.workload,
            Metric::Pairing => self.pairing,
            Metric::Schedule => self.schedule,
            Metric::Diversity => self.diversity,
            Metric::TimeSlot => self.time_slot,
            Metric::Classroom => self.classroom,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Genetic,
    Annealing,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Solved,
    NoSolution,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub r#type: String,
    pub weight: f64,
    pub details: serde_json::Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolveMetrics {
    pub fitness: f64,
    pub scores: SubScores,
    /// Generations (genetic) or annealing iterations consumed.
    pub iterations: usize,
    pub execution_ms: u64,
    pub classroom_usage: BTreeMap<ClassroomId, usize>,
    pub instructor_load: BTreeMap<InstructorId, usize>,
    pub weights: Option<FitnessWeights>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub objective: f64,
    pub assignments: Vec<Assignment>,
    pub violations: Vec<Violation>,
    pub metrics: SolveMetrics,
    pub stats: serde_json::Value,
}

impl SolveResult {
    pub fn no_solution(engine: &str, note: &str) -> Self {
        Self {
            status: SolveStatus::NoSolution,
            objective: 0.0,
            assignments: vec![],
            violations: vec![],
            metrics: SolveMetrics::default(),
            stats: serde_json::json!({ "method": engine, "note": note }),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    InstructorDoubleBooked,
    ClassroomDoubleBooked,
    TimeSlotOverloaded,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity by the number of assignments sharing the contested resource.
    pub fn from_overlap(n: usize) -> Self {
        match n {
            0..=1 => Severity::Low,
            2 => Severity::Medium,
            3 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Reschedule,
    ReplaceJury,
    RelocateClassroom,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub kind: ConflictKind,
    #[serde(default)]
    pub instructor_id: Option<InstructorId>,
    #[serde(default)]
    pub classroom_id: Option<ClassroomId>,
    pub time_slot_id: TimeSlotId,
    /// Indices into the assignment list that was scanned.
    pub assignments: Vec<usize>,
    pub severity: Severity,
    pub suggested: ResolutionStrategy,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionEntry {
    pub conflict: usize,
    pub success: bool,
    #[serde(default)]
    pub strategy: Option<ResolutionStrategy>,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub assignments: Vec<Assignment>,
    pub conflicts: Vec<Conflict>,
    pub log: Vec<ResolutionEntry>,
    pub remaining: usize,
}

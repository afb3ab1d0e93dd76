//! Construction of initial candidate solutions.
//!
//! A paired build ranks instructors by load, splits the ranking into an upper
//! and a lower part, pairs members across the split, and places the pair's
//! projects into consecutive slots with the supervisor role alternating.
//! Every project gets exactly one assignment; when no clean placement exists
//! the least conflicting one is taken.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use types::{BuilderConfig, ProjectKind, Solution};

use crate::prep::{Placed, Prep};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SortStrategy {
    #[default]
    LoadDescending,
    LoadJitter,
    LoadThenId,
    NameThenLoad,
    LoadBuckets,
}

impl SortStrategy {
    pub const ALL: [Self; 5] = [
        Self::LoadDescending,
        Self::LoadJitter,
        Self::LoadThenId,
        Self::NameThenLoad,
        Self::LoadBuckets,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SplitStrategy {
    #[default]
    Half,
    FortySixty,
    SixtyForty,
    Interleaved,
    Mirrored,
}

impl SplitStrategy {
    pub const ALL: [Self; 5] = [
        Self::Half,
        Self::FortySixty,
        Self::SixtyForty,
        Self::Interleaved,
        Self::Mirrored,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PairStrategy {
    #[default]
    AvailabilityOverlap,
    ExpertiseDiversity,
    LowCollaboration,
    LoadSimilarity,
    LoadContrast,
    /// A random criterion per pair.
    Hybrid,
}

impl PairStrategy {
    pub const ALL: [Self; 6] = [
        Self::AvailabilityOverlap,
        Self::ExpertiseDiversity,
        Self::LowCollaboration,
        Self::LoadSimilarity,
        Self::LoadContrast,
        Self::Hybrid,
    ];
    const CRITERIA: [Self; 5] = [
        Self::AvailabilityOverlap,
        Self::ExpertiseDiversity,
        Self::LowCollaboration,
        Self::LoadSimilarity,
        Self::LoadContrast,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SlotStrategy {
    #[default]
    Consecutive,
    Distributed,
    BalancedDay,
    ClassroomDiverse,
}

impl SlotStrategy {
    pub const ALL: [Self; 4] = [
        Self::Consecutive,
        Self::Distributed,
        Self::BalancedDay,
        Self::ClassroomDiverse,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PairingPlan {
    pub sort: SortStrategy,
    pub split: SplitStrategy,
    pub pair: PairStrategy,
    pub slot: SlotStrategy,
}

impl PairingPlan {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::randomized(rng, 1.0)
    }

    /// Each component is drawn at random with probability `p`, otherwise the default.
    pub fn randomized<R: Rng>(rng: &mut R, p: f64) -> Self {
        let d = Self::default();
        Self {
            sort: pick(rng, p, d.sort, &SortStrategy::ALL),
            split: pick(rng, p, d.split, &SplitStrategy::ALL),
            pair: pick(rng, p, d.pair, &PairStrategy::ALL),
            slot: pick(rng, p, d.slot, &SlotStrategy::ALL),
        }
    }
}

fn pick<T: Copy, R: Rng>(rng: &mut R, p: f64, default: T, all: &[T]) -> T {
    if rng.gen_bool(p.clamp(0.0, 1.0)) {
        all.choose(rng).copied().unwrap_or(default)
    } else {
        default
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildStrategy {
    Random,
    Paired(PairingPlan),
}

/// A paired plan with probability `structured_probability`, otherwise a random draw.
pub fn random_strategy<R: Rng>(rng: &mut R, cfg: &BuilderConfig) -> BuildStrategy {
    if rng.gen_bool(cfg.structured_probability.clamp(0.0, 1.0)) {
        BuildStrategy::Paired(PairingPlan::random(rng))
    } else {
        BuildStrategy::Random
    }
}

/// Builds one candidate. The snapshot is not touched; loads are tracked on a
/// private copy.
pub fn build<R: Rng>(
    prep: &Prep,
    strategy: BuildStrategy,
    cfg: &BuilderConfig,
    rng: &mut R,
) -> Solution {
    if prep.n_instructors() == 0 || prep.n_classrooms() == 0 || prep.n_slots() == 0 {
        return Solution::default();
    }
    let mut b = Builder::new(prep, cfg);
    match strategy {
        BuildStrategy::Random => b.build_random(rng),
        BuildStrategy::Paired(plan) => b.build_paired(plan, rng),
    }
    b.finish()
}

pub fn sort_instructors<R: Rng>(
    prep: &Prep,
    loads: &[u32],
    strategy: SortStrategy,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..prep.n_instructors()).collect();
    let id = |i: usize| &prep.instructor(i).id;
    let name = |i: usize| &prep.instructor(i).name;
    match strategy {
        SortStrategy::LoadDescending => order.sort_by(|&a, &b| loads[b].cmp(&loads[a])),
        SortStrategy::LoadJitter => {
            let mut keyed: Vec<(usize, f64)> = order
                .iter()
                .map(|&i| (i, loads[i] as f64 + rng.gen::<f64>() * 1.5))
                .collect();
            keyed.sort_by(|a, b| b.1.total_cmp(&a.1));
            order = keyed.into_iter().map(|(i, _)| i).collect();
        }
        SortStrategy::LoadThenId => {
            order.sort_by(|&a, &b| loads[b].cmp(&loads[a]).then_with(|| id(a).cmp(id(b))))
        }
        SortStrategy::NameThenLoad => {
            order.sort_by(|&a, &b| name(a).cmp(name(b)).then_with(|| loads[b].cmp(&loads[a])))
        }
        SortStrategy::LoadBuckets => {
            let min = loads.iter().copied().min().unwrap_or(0);
            let max = loads.iter().copied().max().unwrap_or(0);
            let width = ((max - min) / 3).max(1);
            let mut buckets: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
            for &i in &order {
                buckets.entry((loads[i] - min) / width).or_default().push(i);
            }
            order.clear();
            for bucket in buckets.values_mut().rev() {
                bucket.shuffle(rng);
                order.extend(bucket.iter().copied());
            }
        }
    }
    order
}

/// Splits a ranking into (upper, lower).
pub fn split(order: &[usize], strategy: SplitStrategy) -> (Vec<usize>, Vec<usize>) {
    let n = order.len();
    let cut = |tenths: usize| if n < 2 { n } else { (n * tenths / 10).clamp(1, n - 1) };
    match strategy {
        SplitStrategy::Half => {
            let (u, l) = order.split_at(cut(5));
            (u.to_vec(), l.to_vec())
        }
        SplitStrategy::FortySixty => {
            let (u, l) = order.split_at(cut(4));
            (u.to_vec(), l.to_vec())
        }
        SplitStrategy::SixtyForty => {
            let (u, l) = order.split_at(cut(6));
            (u.to_vec(), l.to_vec())
        }
        SplitStrategy::Interleaved => (
            order.iter().step_by(2).copied().collect(),
            order.iter().skip(1).step_by(2).copied().collect(),
        ),
        SplitStrategy::Mirrored => {
            let (u, l) = order.split_at(n / 2);
            (u.to_vec(), l.iter().rev().copied().collect())
        }
    }
}

fn pair_affinity(prep: &Prep, loads: &[u32], crit: PairStrategy, a: usize, b: usize) -> f64 {
    let load_gap = (loads[a] as f64 - loads[b] as f64).abs();
    match crit {
        PairStrategy::AvailabilityOverlap => prep.shared_availability(a, b) as f64,
        PairStrategy::ExpertiseDiversity => {
            let ea: HashSet<&String> = prep.instructor(a).expertise.iter().collect();
            let eb: HashSet<&String> = prep.instructor(b).expertise.iter().collect();
            ea.symmetric_difference(&eb).count() as f64
        }
        PairStrategy::LowCollaboration => -(prep.collaborations(a, b) as f64),
        PairStrategy::LoadSimilarity => -load_gap,
        PairStrategy::LoadContrast => load_gap,
        PairStrategy::Hybrid => 0.0,
    }
}

/// Greedily pairs each upper instructor with the best remaining lower one.
pub fn pair_up<R: Rng>(
    prep: &Prep,
    upper: &[usize],
    lower: &[usize],
    loads: &[u32],
    strategy: PairStrategy,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let mut free = lower.to_vec();
    let mut pairs = Vec::with_capacity(upper.len().min(lower.len()));
    for &u in upper {
        if free.is_empty() {
            break;
        }
        let crit = match strategy {
            PairStrategy::Hybrid => *PairStrategy::CRITERIA
                .choose(rng)
                .unwrap_or(&PairStrategy::AvailabilityOverlap),
            s => s,
        };
        let best = (0..free.len())
            .max_by(|&x, &y| {
                pair_affinity(prep, loads, crit, u, free[x])
                    .total_cmp(&pair_affinity(prep, loads, crit, u, free[y]))
                    .then(y.cmp(&x))
            })
            .unwrap_or(0);
        pairs.push((u, free.remove(best)));
    }
    pairs
}

#[derive(Clone)]
struct Occupancy {
    room: HashSet<(usize, usize)>,
    instructor: HashSet<(usize, usize)>,
    slot_use: Vec<usize>,
    room_use: Vec<usize>,
    day_use: HashMap<u32, usize>,
}

impl Occupancy {
    fn new(prep: &Prep) -> Self {
        Self {
            room: HashSet::new(),
            instructor: HashSet::new(),
            slot_use: vec![0; prep.n_slots()],
            room_use: vec![0; prep.n_classrooms()],
            day_use: HashMap::new(),
        }
    }

    fn room_free(&self, c: usize, t: usize) -> bool {
        !self.room.contains(&(c, t))
    }

    fn free(&self, prep: &Prep, i: usize, t: usize) -> bool {
        prep.available(i, t) && !self.instructor.contains(&(i, t))
    }
}

struct Builder<'p, 'a> {
    prep: &'p Prep<'a>,
    cfg: &'p BuilderConfig,
    occ: Occupancy,
    loads: Vec<u32>,
    placed: Vec<Option<Placed>>,
}

impl<'p, 'a> Builder<'p, 'a> {
    fn new(prep: &'p Prep<'a>, cfg: &'p BuilderConfig) -> Self {
        Self {
            prep,
            cfg,
            occ: Occupancy::new(prep),
            loads: prep.base_loads(),
            placed: vec![None; prep.n_projects()],
        }
    }

    fn finish(self) -> Solution {
        Solution::new(
            self.placed
                .iter()
                .flatten()
                .map(|p| self.prep.encode(p))
                .collect(),
        )
    }

    fn commit(&mut self, project: usize, classroom: usize, slot: usize, panel: Vec<usize>) {
        self.occ.room.insert((classroom, slot));
        self.occ.slot_use[slot] += 1;
        self.occ.room_use[classroom] += 1;
        *self.occ.day_use.entry(self.prep.slot_day[slot]).or_default() += 1;
        for &i in &panel {
            self.occ.instructor.insert((i, slot));
            self.loads[i] += 1;
        }
        self.placed[project] = Some(Placed {
            project,
            classroom,
            slot,
            panel,
            responsible: self.prep.project_owner[project],
        });
    }

    fn build_random<R: Rng>(&mut self, rng: &mut R) {
        let (n_c, n_t, n_i) = (
            self.prep.n_classrooms(),
            self.prep.n_slots(),
            self.prep.n_instructors(),
        );
        for pi in 0..self.prep.n_projects() {
            let c = rng.gen_range(0..n_c);
            let t = rng.gen_range(0..n_t);
            let mut panel: Vec<usize> = self.prep.project_owner[pi].into_iter().collect();
            let mut others: Vec<usize> = (0..n_i).filter(|i| !panel.contains(i)).collect();
            others.shuffle(rng);
            let need = self.prep.snap.projects[pi].panel_size();
            let missing = need.saturating_sub(panel.len());
            panel.extend(others.into_iter().take(missing));
            self.commit(pi, c, t, panel);
        }
    }

    fn build_paired<R: Rng>(&mut self, plan: PairingPlan, rng: &mut R) {
        let order = sort_instructors(self.prep, &self.loads, plan.sort, rng);
        let (upper, lower) = split(&order, plan.split);
        let pairs = pair_up(self.prep, &upper, &lower, &self.loads, plan.pair, rng);

        for (k, &(a, b)) in pairs.iter().enumerate() {
            let queue = self.pair_queue(a, b);
            for chunk in queue.chunks(2) {
                match *chunk {
                    [p, q] => {
                        if !self.place_consecutive(p, q, (a, b), plan.slot, (k, pairs.len()), rng) {
                            self.place_single(p, Some(partner(self.prep, p, (a, b))), plan.slot, rng);
                            self.place_single(q, Some(partner(self.prep, q, (a, b))), plan.slot, rng);
                        }
                    }
                    [p] => self.place_single(p, Some(partner(self.prep, p, (a, b))), plan.slot, rng),
                    _ => {}
                }
            }
        }

        for pi in 0..self.prep.n_projects() {
            if self.placed[pi].is_none() {
                self.place_single(pi, None, plan.slot, rng);
            }
        }
    }

    /// Unplaced projects of the pair, alternating owners so consecutive
    /// sessions swap the supervisor role.
    fn pair_queue(&self, a: usize, b: usize) -> Vec<usize> {
        let open = |i: usize| -> Vec<usize> {
            self.prep.owned[i]
                .iter()
                .copied()
                .filter(|&p| self.placed[p].is_none())
                .collect()
        };
        let (qa, qb) = (open(a), open(b));
        let mut out = Vec::with_capacity(qa.len() + qb.len());
        for k in 0..qa.len().max(qb.len()) {
            out.extend(qa.get(k));
            out.extend(qb.get(k));
        }
        out
    }

    fn slot_order<R: Rng>(
        &self,
        strategy: SlotStrategy,
        (k, of): (usize, usize),
        rng: &mut R,
    ) -> Vec<usize> {
        let n = self.prep.n_slots();
        let mut order: Vec<usize> = (0..n).collect();
        match strategy {
            SlotStrategy::Consecutive => {}
            SlotStrategy::Distributed => {
                let offset = if of > 0 { k * n / of } else { 0 };
                order.rotate_left(offset % n.max(1));
            }
            SlotStrategy::BalancedDay => {
                let day_use = |t: usize| {
                    self.occ
                        .day_use
                        .get(&self.prep.slot_day[t])
                        .copied()
                        .unwrap_or(0)
                };
                order.sort_by_key(|&t| (day_use(t), t));
            }
            SlotStrategy::ClassroomDiverse => {
                order.shuffle(rng);
                order.sort_by_key(|&t| self.occ.slot_use[t]);
            }
        }
        order
    }

    /// Classrooms ordered least used first.
    fn rooms_by_use<R: Rng>(&self, strategy: SlotStrategy, rng: &mut R) -> Vec<usize> {
        let mut rooms: Vec<usize> = (0..self.prep.n_classrooms()).collect();
        if strategy == SlotStrategy::ClassroomDiverse {
            rooms.shuffle(rng);
        }
        rooms.sort_by_key(|&c| self.occ.room_use[c]);
        rooms
    }

    fn pick_rooms<R: Rng>(
        &self,
        t1: usize,
        t2: usize,
        strategy: SlotStrategy,
        rng: &mut R,
    ) -> Option<(usize, usize)> {
        let rooms = self.rooms_by_use(strategy, rng);
        let flexible = self.prep.n_classrooms() <= self.cfg.flexible_classroom_threshold;
        if !flexible {
            if let Some(&c) = rooms
                .iter()
                .find(|&&c| self.occ.room_free(c, t1) && self.occ.room_free(c, t2))
            {
                return Some((c, c));
            }
        }
        let c1 = rooms.iter().copied().find(|&c| self.occ.room_free(c, t1))?;
        let c2 = rooms.iter().copied().find(|&c| self.occ.room_free(c, t2))?;
        Some((c1, c2))
    }

    /// Fills a panel up to the project's size with free instructors, least
    /// loaded first, preferring supervisors for final projects. With
    /// `strict == false` busy instructors are used as a last resort.
    fn complete_panel(&self, project: usize, core: &[usize], t: usize, strict: bool) -> Vec<usize> {
        let p = &self.prep.snap.projects[project];
        let need = p.panel_size();
        let mut panel: Vec<usize> = Vec::with_capacity(need);
        for &i in core {
            if !panel.contains(&i) && panel.len() < need {
                panel.push(i);
            }
        }
        let wants_supervisor = p.kind == ProjectKind::Final;
        let mut cands: Vec<usize> = (0..self.prep.n_instructors())
            .filter(|i| !panel.contains(i))
            .filter(|&i| !strict || self.occ.free(self.prep, i, t))
            .collect();
        cands.sort_by_key(|&i| {
            (
                !self.occ.free(self.prep, i, t),
                wants_supervisor && !self.prep.instructor(i).can_supervise(),
                self.loads[i],
                i,
            )
        });
        let missing = need.saturating_sub(panel.len());
        panel.extend(cands.into_iter().take(missing));
        panel
    }

    fn place_consecutive<R: Rng>(
        &mut self,
        p: usize,
        q: usize,
        pair: (usize, usize),
        strategy: SlotStrategy,
        position: (usize, usize),
        rng: &mut R,
    ) -> bool {
        let (a, b) = pair;
        for t in self.slot_order(strategy, position, rng) {
            if !self.prep.consecutive(t, t + 1) {
                continue;
            }
            let both_free = [a, b].iter().all(|&i| {
                self.occ.free(self.prep, i, t) && self.occ.free(self.prep, i, t + 1)
            });
            if !both_free {
                continue;
            }
            let Some((c1, c2)) = self.pick_rooms(t, t + 1, strategy, rng) else {
                continue;
            };
            let core_p = session_core(self.prep, p, pair);
            let core_q = session_core(self.prep, q, pair);
            let panel_p = self.complete_panel(p, &core_p, t, true);
            let panel_q = self.complete_panel(q, &core_q, t + 1, true);
            if panel_p.len() < self.prep.snap.projects[p].panel_size()
                || panel_q.len() < self.prep.snap.projects[q].panel_size()
            {
                continue;
            }
            self.commit(p, c1, t, panel_p);
            self.commit(q, c2, t + 1, panel_q);
            return true;
        }
        false
    }

    fn place_single<R: Rng>(
        &mut self,
        project: usize,
        partner: Option<usize>,
        strategy: SlotStrategy,
        rng: &mut R,
    ) {
        let owner = self.prep.project_owner[project];
        let core: Vec<usize> = owner.into_iter().chain(partner).collect();
        let need = self.prep.snap.projects[project].panel_size();

        for t in self.slot_order(strategy, (0, 1), rng) {
            if !core.iter().all(|&i| self.occ.free(self.prep, i, t)) {
                continue;
            }
            let rooms = self.rooms_by_use(strategy, rng);
            let Some(c) = rooms.into_iter().find(|&c| self.occ.room_free(c, t)) else {
                continue;
            };
            let panel = self.complete_panel(project, &core, t, true);
            if panel.len() < need {
                continue;
            }
            self.commit(project, c, t, panel);
            return;
        }

        // No clean placement: take the least conflicting slot and classroom.
        let mut best: Option<(usize, usize, usize)> = None;
        for t in 0..self.prep.n_slots() {
            let busy = core
                .iter()
                .filter(|&&i| !self.occ.free(self.prep, i, t))
                .count();
            for c in 0..self.prep.n_classrooms() {
                let cost = busy * 2 + usize::from(!self.occ.room_free(c, t)) * 2
                    + self.occ.slot_use[t];
                if best.map_or(true, |(b, _, _)| cost < b) {
                    best = Some((cost, t, c));
                }
            }
        }
        if let Some((_, t, c)) = best {
            let panel = self.complete_panel(project, &core, t, false);
            self.commit(project, c, t, panel);
        }
    }
}

fn partner(prep: &Prep, project: usize, (a, b): (usize, usize)) -> usize {
    if prep.project_owner[project] == Some(a) {
        b
    } else {
        a
    }
}

/// Owner first, then the other pair member.
fn session_core(prep: &Prep, project: usize, pair: (usize, usize)) -> Vec<usize> {
    let other = partner(prep, project, pair);
    match prep.project_owner[project] {
        Some(o) => vec![o, other],
        None => vec![pair.0, pair.1],
    }
}

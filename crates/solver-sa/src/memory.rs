use types::Assignment;

#[derive(Clone, Debug)]
pub struct Remembered {
    pub assignments: Vec<Assignment>,
    pub fitness: f64,
}

/// Best solutions of past runs, at most `capacity`. When full, the worst entry
/// is dropped.
#[derive(Clone, Debug)]
pub struct SolutionMemory {
    entries: Vec<Remembered>,
    capacity: usize,
}

impl SolutionMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remember(&mut self, assignments: Vec<Assignment>, fitness: f64) {
        self.entries.push(Remembered {
            assignments,
            fitness,
        });
        while self.entries.len() > self.capacity {
            let worst = self
                .entries
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.fitness.total_cmp(&b.1.fitness))
                .map(|(i, _)| i);
            match worst {
                Some(i) => {
                    self.entries.remove(i);
                }
                None => break,
            }
        }
    }

    pub fn best(&self) -> Option<&Remembered> {
        self.entries
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Remembered> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_entry_is_pruned() {
        let mut m = SolutionMemory::new(3);
        for f in [0.4, 0.1, 0.9, 0.5] {
            m.remember(vec![], f);
        }
        assert_eq!(m.len(), 3);
        let mut kept: Vec<f64> = m.iter().map(|r| r.fitness).collect();
        kept.sort_by(f64::total_cmp);
        assert_eq!(kept, vec![0.4, 0.5, 0.9]);
        assert_eq!(m.best().map(|r| r.fitness), Some(0.9));
    }
}

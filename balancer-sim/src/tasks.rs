/// Pull-based source over a pre-generated list of task loads
#[derive(Debug, Clone)]
pub(crate) struct TaskSource {
    loads: Vec<f64>,
    next: usize,
}

impl TaskSource {
    pub(crate) fn new(loads: Vec<f64>) -> Self {
        TaskSource { loads, next: 0 }
    }

    pub(crate) fn total(&self) -> usize {
        self.loads.len()
    }

    /// Number of tasks already handed out
    pub(crate) fn taken(&self) -> usize {
        self.next
    }

    pub(crate) fn remaining(&self) -> usize {
        self.loads.len() - self.next
    }

    /// Splits the not yet handed out tasks into `parts` round-robin batches.
    pub(crate) fn split(self, parts: usize) -> Vec<Vec<f64>> {
        let parts = parts.max(1);
        let mut batches = vec![Vec::new(); parts];
        for (i, load) in self.loads[self.next..].iter().enumerate() {
            batches[i % parts].push(*load);
        }
        batches
    }
}

impl Iterator for TaskSource {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let load = self.loads.get(self.next).copied()?;
        self.next += 1;
        Some(load)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_source_counts() {
        let mut tasks = TaskSource::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(tasks.next(), Some(1.0));
        assert_eq!(tasks.taken(), 1);
        assert_eq!(tasks.remaining(), 2);
        assert_eq!(tasks.by_ref().collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert_eq!(tasks.next(), None);
        assert_eq!(tasks.total(), 3);
    }

    #[test]
    fn test_split_round_robin() {
        let mut tasks = TaskSource::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        tasks.next();
        let batches = tasks.split(2);
        assert_eq!(batches, vec![vec![2.0, 4.0], vec![3.0, 5.0]]);
    }
}

//! Scheduled tasks on a logical clock
//!
//! "Run at time T" semantics without callbacks: owners schedule plain
//! values and collect the ones that have come due when they poll.

#[derive(Debug, Clone)]
struct Scheduled<T> {
    at: f64,
    task: T,
}

/// Time-ordered queue; tasks due at the same time run in schedule order
#[derive(Debug, Clone)]
pub struct TaskQueue<T> {
    tasks: Vec<Scheduled<T>>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Schedule `task` to run at time `at`
    pub fn schedule(&mut self, at: f64, task: T) {
        let index = self.tasks.partition_point(|s| s.at <= at);
        self.tasks.insert(index, Scheduled { at, task });
    }

    /// Remove the earliest task due at or before `now`
    pub fn pop_due(&mut self, now: f64) -> Option<T> {
        match self.tasks.first() {
            Some(first) if first.at <= now => Some(self.tasks.remove(0).task),
            _ => None,
        }
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Time of the earliest pending task
    pub fn next_due(&self) -> Option<f64> {
        self.tasks.first().map(|s| s.at)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_in_time_order() {
        let mut queue = TaskQueue::new();
        queue.schedule(3.0, "c");
        queue.schedule(1.0, "a");
        queue.schedule(2.0, "b");

        assert_eq!(queue.pop_due(0.5), None);
        assert_eq!(queue.pop_due(2.5), Some("a"));
        assert_eq!(queue.pop_due(2.5), Some("b"));
        assert_eq!(queue.pop_due(2.5), None);
        assert_eq!(queue.next_due(), Some(3.0));
    }

    #[test]
    fn test_same_time_keeps_schedule_order() {
        let mut queue = TaskQueue::new();
        queue.schedule(1.0, 1);
        queue.schedule(1.0, 2);
        assert_eq!(queue.pop_due(1.0), Some(1));
        assert_eq!(queue.pop_due(1.0), Some(2));
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut queue = TaskQueue::new();
        queue.schedule(1.0, "x");
        queue.schedule(2.0, "y");
        assert_eq!(queue.len(), 2);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop_due(10.0), None);
    }
}

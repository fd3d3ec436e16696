//! Repeating tasks driven by the host's clock.
//!
//! Nothing here spawns threads. The owner calls [`Timers::due`] with the
//! current time and runs whatever came due. [`Timers::cancel_all`] ends every
//! schedule for good.

/// Identifies a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

#[derive(Debug, Clone)]
struct RepeatingTask {
    id: TaskId,
    interval_millis: i64,
    next_due: i64,
}

/// A set of repeating tasks.
#[derive(Debug, Default)]
pub struct Timers {
    tasks: Vec<RepeatingTask>,
    next_id: usize,
    cancelled: bool,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task every `interval_millis`, first due one interval after `now`.
    ///
    /// Returns `None` once the schedule has been torn down, or for a
    /// non-positive interval.
    pub fn schedule(&mut self, now: i64, interval_millis: i64) -> Option<TaskId> {
        if self.cancelled || interval_millis <= 0 {
            return None;
        }
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(RepeatingTask {
            id,
            interval_millis,
            next_due: now.saturating_add(interval_millis),
        });
        Some(id)
    }

    /// Every task due at or before `now`, in schedule order, each paired with `now`.
    ///
    /// A task fires at most once per call. Intervals missed while the host
    /// was not ticking are skipped, and the task is realigned to its next
    /// boundary after `now`.
    pub fn due(&mut self, now: i64) -> Vec<(TaskId, i64)> {
        let mut fired = Vec::new();
        for task in &mut self.tasks {
            if task.next_due > now {
                continue;
            }
            fired.push((task.id, now));

            let missed = now.saturating_sub(task.next_due) / task.interval_millis;
            task.next_due = missed
                .checked_add(1)
                .and_then(|n| n.checked_mul(task.interval_millis))
                .and_then(|step| task.next_due.checked_add(step))
                .unwrap_or(i64::MAX);
        }
        fired
    }

    pub fn cancel(&mut self, id: TaskId) {
        self.tasks.retain(|task| task.id != id);
    }

    /// Cancel everything; later calls to `schedule` are refused.
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
        self.cancelled = true;
    }

    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_each_interval() {
        let mut timers = Timers::new();
        let id = timers.schedule(0, 30_000).unwrap();

        assert!(timers.due(29_999).is_empty());
        assert_eq!(timers.due(30_000), vec![(id, 30_000)]);
        assert!(timers.due(59_999).is_empty());
        assert_eq!(timers.due(61_000), vec![(id, 61_000)]);
    }

    #[test]
    fn test_missed_intervals_fire_once() {
        let mut timers = Timers::new();
        let id = timers.schedule(0, 30_000).unwrap();

        assert_eq!(timers.due(95_000), vec![(id, 95_000)]);
        assert!(timers.due(119_999).is_empty());
        assert_eq!(timers.due(120_000), vec![(id, 120_000)]);
    }

    #[test]
    fn test_far_future_tick_does_not_overflow() {
        let mut timers = Timers::new();
        let id = timers.schedule(0, 30_000).unwrap();

        assert_eq!(timers.due(i64::MAX - 1), vec![(id, i64::MAX - 1)]);
        assert!(timers.due(i64::MAX - 1).is_empty());
    }

    #[test]
    fn test_cancel_all_stops_everything() {
        let mut timers = Timers::new();
        timers.schedule(0, 10).unwrap();
        timers.cancel_all();

        assert!(timers.due(1_000).is_empty());
        assert_eq!(timers.schedule(0, 10), None);
        assert_eq!(timers.active(), 0);
    }

    #[test]
    fn test_cancel_single() {
        let mut timers = Timers::new();
        let a = timers.schedule(0, 10).unwrap();
        let b = timers.schedule(0, 15).unwrap();
        timers.cancel(a);

        assert_eq!(timers.due(20), vec![(b, 20)]);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut timers = Timers::new();
        assert_eq!(timers.schedule(0, 0), None);
    }
}

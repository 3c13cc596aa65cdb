//! Cancellable timers driven by an injected clock
//!
//! Stands in for browser interval/timeout callbacks. Nothing fires on its
//! own: the owner calls [`Scheduler::pop_due`] with the current time and
//! handles whatever comes back.

/// What a scheduled task does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Recompute the discount of the active round
    GrowthTick,
    /// One second of the join countdown elapsed
    CountdownStep,
    /// Post-round delay elapsed
    Rearm,
}

/// Handle used to cancel a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Task {
    id: TaskId,
    kind: TaskKind,
    due_ms: f64,
    /// `Some` for repeating tasks
    period_ms: Option<f64>,
}

/// A task that came due
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fired {
    pub id: TaskId,
    pub kind: TaskKind,
    /// When the task was due (may be earlier than the pump time)
    pub due_ms: f64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Fire once at `due_ms`
    pub fn schedule_once(&mut self, kind: TaskKind, due_ms: f64) -> TaskId {
        let id = self.allocate_id();
        self.tasks.push(Task {
            id,
            kind,
            due_ms,
            period_ms: None,
        });
        id
    }

    /// Fire every `period_ms`, first at `first_due_ms`
    pub fn schedule_repeating(&mut self, kind: TaskKind, first_due_ms: f64, period_ms: f64) -> TaskId {
        let id = self.allocate_id();
        self.tasks.push(Task {
            id,
            kind,
            due_ms: first_due_ms,
            period_ms: Some(period_ms),
        });
        id
    }

    /// Cancel a task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Number of pending tasks of a kind
    pub fn count(&self, kind: TaskKind) -> usize {
        self.tasks.iter().filter(|t| t.kind == kind).count()
    }

    /// Earliest due time among pending tasks
    pub fn next_due(&self) -> Option<f64> {
        self.tasks
            .iter()
            .map(|t| t.due_ms)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Take the earliest task due at or before `now_ms`
    ///
    /// One-shot tasks are removed. Repeating tasks fire once even if several
    /// periods were missed, then move to their first period after `now_ms`.
    /// Ties go to the task scheduled first.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<Fired> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.0.cmp(&b.id.0))
            })
            .map(|(i, _)| i)?;

        let task = &mut self.tasks[index];
        let fired = Fired {
            id: task.id,
            kind: task.kind,
            due_ms: task.due_ms,
        };

        match task.period_ms {
            Some(period) => {
                let mut next = task.due_ms + period;
                if next <= now_ms {
                    let missed = ((now_ms - next) / period).floor() + 1.0;
                    next += missed * period;
                }
                task.due_ms = next;
            }
            None => {
                self.tasks.remove(index);
            }
        }

        Some(fired)
    }
}

//! Deferred task queue for low-priority work.
//!
//! Tasks are closures over a context (`&mut Ctx`) that run when the owner
//! next drains the queue, typically from its host's idle callback. Combined
//! with [`CoalescingToken`], a burst of requests collapses to the latest one:
//! each posted task captures a ticket, and when it runs it does nothing unless
//! its ticket is still the current one.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A unique identifier for a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

type BoxedTask<Ctx> = Box<dyn FnOnce(&mut Ctx) + Send + 'static>;

struct TaskData<Ctx> {
    id: TaskId,
    task: BoxedTask<Ctx>,
}

/// A FIFO of deferred tasks over a context type.
pub struct TaskQueue<Ctx> {
    tasks: VecDeque<TaskData<Ctx>>,
}

impl<Ctx> TaskQueue<Ctx> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Post a task. Returns an ID that can be used to cancel it.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce(&mut Ctx) + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            task: Box::new(task),
        });
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Detach all pending tasks so they can be run against a context that
    /// owns this queue.
    ///
    /// Tasks posted while the returned batch runs land in the (now empty)
    /// queue and are picked up by the next drain.
    pub fn take_batch(&mut self) -> TaskBatch<Ctx> {
        TaskBatch {
            tasks: std::mem::take(&mut self.tasks),
        }
    }
}

impl<Ctx> Default for TaskQueue<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> fmt::Debug for TaskQueue<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}

/// A detached batch of tasks taken from a [`TaskQueue`].
pub struct TaskBatch<Ctx> {
    tasks: VecDeque<TaskData<Ctx>>,
}

impl<Ctx> TaskBatch<Ctx> {
    /// Run every task in the batch in posting order.
    ///
    /// Returns the number of tasks executed.
    pub fn run(self, ctx: &mut Ctx) -> usize {
        let count = self.tasks.len();
        for task_data in self.tasks {
            (task_data.task)(ctx);
        }
        count
    }
}

/// Latest-wins ticket dispenser for coalescing deferred requests.
///
/// Cancellation is by ticket mismatch: issuing a new ticket makes every
/// earlier one stale, and stale tasks skip their work.
#[derive(Debug, Default, Clone)]
pub struct CoalescingToken {
    current: u64,
}

impl CoalescingToken {
    /// Create a dispenser with no outstanding ticket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, invalidating all earlier ones.
    pub fn next(&mut self) -> u64 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    /// Returns `true` if `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.current == ticket
    }

    /// Invalidate all outstanding tickets without issuing a usable one.
    pub fn invalidate(&mut self) {
        self.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_in_order() {
        let mut queue: TaskQueue<Vec<u32>> = TaskQueue::new();
        queue.post(|log| log.push(1));
        queue.post(|log| log.push(2));
        assert_eq!(queue.pending_count(), 2);

        let mut log = Vec::new();
        assert_eq!(queue.take_batch().run(&mut log), 2);
        assert_eq!(log, vec![1, 2]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_cancel_task() {
        let mut queue: TaskQueue<Vec<u32>> = TaskQueue::new();
        let id = queue.post(|log| log.push(1));
        queue.post(|log| log.push(2));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));

        let mut log = Vec::new();
        queue.take_batch().run(&mut log);
        assert_eq!(log, vec![2]);
    }

    #[test]
    fn test_coalescing_token_latest_wins() {
        struct Ctx {
            token: CoalescingToken,
            runs: Vec<u64>,
        }

        let mut queue: TaskQueue<Ctx> = TaskQueue::new();
        let mut ctx = Ctx {
            token: CoalescingToken::new(),
            runs: Vec::new(),
        };

        for _ in 0..3 {
            let ticket = ctx.token.next();
            queue.post(move |ctx: &mut Ctx| {
                if ctx.token.is_current(ticket) {
                    ctx.runs.push(ticket);
                }
            });
        }

        queue.take_batch().run(&mut ctx);
        assert_eq!(ctx.runs, vec![3]);
    }

    #[test]
    fn test_invalidate_cancels_outstanding_ticket() {
        let mut token = CoalescingToken::new();
        let ticket = token.next();
        token.invalidate();
        assert!(!token.is_current(ticket));
    }
}

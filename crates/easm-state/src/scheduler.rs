//! Deferred execution of listener flushes.
//!
//! A store never notifies listeners inside the write that caused the change.
//! It hands a [`FlushTask`] to its [`Scheduler`], which runs the task on a
//! later turn so every write made in the current turn is coalesced into one
//! notification pass.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Work queued by a store to run its flush.
pub type FlushTask = Box<dyn FnOnce()>;

/// Strategy for running a flush after the current turn of work.
///
/// Implementations must not run `task` from inside `schedule`.
pub trait Scheduler {
    /// Queue `task` for a later turn.
    fn schedule(&self, task: FlushTask) -> ScheduledFlush;
}

/// Handle to a queued flush.
///
/// Dropping the handle leaves the task queued; call [`ScheduledFlush::cancel`]
/// to withdraw it.
pub struct ScheduledFlush {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl ScheduledFlush {
    /// Wrap a cancellation hook.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle whose task cannot be withdrawn.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Withdraw the task if it has not run yet.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for ScheduledFlush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledFlush")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ManualQueue {
    next_id: u64,
    tasks: VecDeque<(u64, FlushTask)>,
}

/// Scheduler driven explicitly by the host.
///
/// Tasks wait in a queue until [`ManualScheduler::run_pending`] is called.
/// Clones share the same queue, so a host can keep one clone and hand another
/// to the store.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.borrow().tasks.len()
    }

    /// Run one turn: every task queued before this call.
    ///
    /// Tasks scheduled while the turn runs wait for the next call. Returns
    /// the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut self.queue.borrow_mut().tasks);
        let count = batch.len();
        for (_, task) in batch {
            task();
        }
        count
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, task: FlushTask) -> ScheduledFlush {
        let id = {
            let mut queue = self.queue.borrow_mut();
            let id = queue.next_id;
            queue.next_id += 1;
            queue.tasks.push_back((id, task));
            id
        };
        let queue: Weak<RefCell<ManualQueue>> = Rc::downgrade(&self.queue);
        ScheduledFlush::new(move || {
            if let Some(queue) = queue.upgrade() {
                queue.borrow_mut().tasks.retain(|(queued, _)| *queued != id);
            }
        })
    }
}

/// Scheduler that runs flushes as tokio local tasks.
///
/// Must be used from inside a [`tokio::task::LocalSet`]. The task yields once
/// before flushing so writes made by other ready tasks in the same tick are
/// folded into the same pass.
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalTaskScheduler;

#[cfg(feature = "tokio")]
impl Scheduler for LocalTaskScheduler {
    fn schedule(&self, task: FlushTask) -> ScheduledFlush {
        let handle = tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            task();
        });
        ScheduledFlush::new(move || handle.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter_task(counter: &Rc<Cell<u32>>) -> FlushTask {
        let counter = counter.clone();
        Box::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn test_manual_scheduler_runs_on_demand() {
        let scheduler = ManualScheduler::new();
        let runs = Rc::new(Cell::new(0));

        let _a = scheduler.schedule(counter_task(&runs));
        let _b = scheduler.schedule(counter_task(&runs));
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(runs.get(), 0);

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(runs.get(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancel_withdraws_task() {
        let scheduler = ManualScheduler::new();
        let runs = Rc::new(Cell::new(0));

        let handle = scheduler.schedule(counter_task(&runs));
        let _keep = scheduler.schedule(counter_task(&runs));
        handle.cancel();

        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_tasks_scheduled_during_turn_wait() {
        let scheduler = ManualScheduler::new();
        let runs = Rc::new(Cell::new(0));

        let inner = scheduler.clone();
        let nested_runs = runs.clone();
        let _outer = scheduler.schedule(Box::new(move || {
            let _ = inner.schedule(counter_task(&nested_runs));
        }));

        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(runs.get(), 0);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_local_task_scheduler_defers() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let runs = Rc::new(Cell::new(0));
                let _handle = LocalTaskScheduler.schedule(counter_task(&runs));
                assert_eq!(runs.get(), 0);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                assert_eq!(runs.get(), 1);

                let cancelled = LocalTaskScheduler.schedule(counter_task(&runs));
                cancelled.cancel();
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                assert_eq!(runs.get(), 1);
            })
            .await;
    }
}

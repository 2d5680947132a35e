//! Bounded task runner
//!
//! Tracks spawned tasks, caps how many read tasks run at once and detects
//! the first failing task. Only the owner (`&mut self`) appends to or prunes
//! the tracked list; spawned tasks only touch the shared in-flight counter.

use crate::error::{Error, Result, TaskFailure};
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Default cap on concurrently running read tasks
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 10_000;

/// Default upper bound of a single capacity wait
pub const DEFAULT_SLEEP_TIME: Duration = Duration::from_millis(100);

/// Task runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of counted tasks in flight
    pub max_concurrent_tasks: usize,
    /// Upper bound of one wait for capacity
    pub sleep_time: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            sleep_time: DEFAULT_SLEEP_TIME,
        }
    }
}

impl RunnerConfig {
    /// Set the concurrency limit
    #[must_use]
    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Set the capacity wait bound
    #[must_use]
    pub fn with_sleep_time(mut self, sleep_time: Duration) -> Self {
        self.sleep_time = sleep_time;
        self
    }
}

// ============================================================================
// Capacity
// ============================================================================

#[derive(Debug)]
struct Capacity {
    in_flight: AtomicUsize,
    limit: usize,
    sleep_time: Duration,
    released: Notify,
}

impl Capacity {
    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn is_full(&self) -> bool {
        self.in_flight() >= self.limit
    }
}

/// Held by a counted task for as long as its future is alive
struct InFlightGuard {
    capacity: Arc<Capacity>,
}

impl InFlightGuard {
    fn acquire(capacity: Arc<Capacity>) -> Self {
        capacity.in_flight.fetch_add(1, Ordering::AcqRel);
        Self { capacity }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.capacity.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.capacity.released.notify_waiters();
    }
}

/// Read-only view of the runner's in-flight count
#[derive(Debug, Clone)]
pub struct CapacityGauge {
    capacity: Arc<Capacity>,
}

impl CapacityGauge {
    /// Counted tasks currently in flight
    pub fn in_flight(&self) -> usize {
        self.capacity.in_flight()
    }

    /// Configured limit
    pub fn limit(&self) -> usize {
        self.capacity.limit
    }

    /// Whether a new read task would have to wait
    pub fn has_reached_limit(&self) -> bool {
        self.capacity.is_full()
    }

    /// Wait until the runner has room for another read task
    pub async fn wait_for_capacity(&self) {
        loop {
            // Registered before the check so a release in between is not missed
            let released = self.capacity.released.notified();
            if !self.capacity.is_full() {
                return;
            }
            let _ = tokio::time::timeout(self.capacity.sleep_time, released).await;
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

struct TrackedTask {
    label: String,
    handle: JoinHandle<Result<()>>,
}

enum Outcome {
    Ok,
    Failed(Error),
    Running,
}

impl TrackedTask {
    /// Take the result of a finished task without blocking
    fn outcome(&mut self) -> Outcome {
        if !self.handle.is_finished() {
            return Outcome::Running;
        }
        match tokio::task::unconstrained(&mut self.handle).now_or_never() {
            Some(Ok(Ok(()))) => Outcome::Ok,
            Some(Ok(Err(e))) => Outcome::Failed(e),
            Some(Err(e)) if e.is_cancelled() => Outcome::Ok,
            Some(Err(e)) => Outcome::Failed(Error::Other(format!("task panicked: {e}"))),
            None => Outcome::Running,
        }
    }
}

/// Runs tasks on the current tokio runtime with a cap on in-flight read tasks
pub struct BoundedTaskRunner {
    runtime: Handle,
    capacity: Arc<Capacity>,
    tasks: Vec<TrackedTask>,
    shut_down: bool,
}

impl BoundedTaskRunner {
    /// Create a runner bound to the current tokio runtime
    pub fn new(config: RunnerConfig) -> Result<Self> {
        if config.max_concurrent_tasks == 0 {
            return Err(Error::invalid_value(
                "max_concurrent_tasks",
                "must be at least 1",
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("Task runner needs a tokio runtime: {e}")))?;

        Ok(Self {
            runtime,
            capacity: Arc::new(Capacity {
                in_flight: AtomicUsize::new(0),
                limit: config.max_concurrent_tasks,
                sleep_time: config.sleep_time,
                released: Notify::new(),
            }),
            tasks: Vec::new(),
            shut_down: false,
        })
    }

    /// Capacity view for producers
    pub fn gauge(&self) -> CapacityGauge {
        CapacityGauge {
            capacity: Arc::clone(&self.capacity),
        }
    }

    /// Counted tasks currently in flight
    pub fn in_flight(&self) -> usize {
        self.capacity.in_flight()
    }

    /// Tasks tracked and not yet pruned
    pub fn tracked(&self) -> usize {
        self.tasks.len()
    }

    /// Submit a read task, waiting for capacity first
    ///
    /// Finished tasks are pruned while waiting, so a failure surfaces here
    /// instead of leaving the caller blocked.
    pub async fn submit<F>(&mut self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.ensure_running()?;
        let label = label.into();
        let capacity = Arc::clone(&self.capacity);

        loop {
            self.prune_futures()?;
            let released = capacity.released.notified();
            if !capacity.is_full() {
                break;
            }
            warn!(
                task = %label,
                in_flight = capacity.in_flight(),
                limit = capacity.limit,
                "Main task is waiting because the task limit has been reached"
            );
            let _ = tokio::time::timeout(capacity.sleep_time, released).await;
        }

        self.spawn(label, task, true);
        Ok(())
    }

    /// Submit a task that is tracked for failures but not counted against the limit
    pub fn submit_unbounded<F>(&mut self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.ensure_running()?;
        self.spawn(label.into(), task, false);
        Ok(())
    }

    fn spawn<F>(&mut self, label: String, task: F, counted: bool)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let guard = counted.then(|| InFlightGuard::acquire(Arc::clone(&self.capacity)));
        let handle = self.runtime.spawn(async move {
            let _guard = guard;
            task.await
        });
        debug!(task = %label, counted, "Submitted task");
        self.tasks.push(TrackedTask { label, handle });
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down {
            return Err(Error::RunnerShutDown);
        }
        Ok(())
    }

    /// Drop finished tasks; the first failed one shuts the runner down
    pub fn prune_futures(&mut self) -> Result<()> {
        let mut index = self.tasks.len();
        while index > 0 {
            index -= 1;
            match self.tasks[index].outcome() {
                Outcome::Running => {}
                Outcome::Ok => {
                    self.tasks.swap_remove(index);
                }
                Outcome::Failed(e) => {
                    let task = self.tasks.swap_remove(index);
                    error!(task = %task.label, error = %e, "Task failed");
                    self.shutdown();
                    return Err(Error::task_failed(task.label, e));
                }
            }
        }
        Ok(())
    }

    /// Whether every tracked task has finished
    pub fn is_done(&self) -> bool {
        self.tasks.iter().all(|t| t.handle.is_finished())
    }

    /// Wait at most `max_wait` for every tracked task to finish
    ///
    /// Returns whether they all did.
    pub async fn wait_until_done(&self, max_wait: Duration) -> bool {
        let all_finished = async {
            while !self.is_done() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        };
        tokio::time::timeout(max_wait, all_finished).await.is_ok()
    }

    /// Fail with every task error seen, or shut down cleanly
    ///
    /// Must only be called once `is_done` holds; pending tasks without any
    /// failure are reported as `TasksPending`.
    pub fn check_for_errors_and_shutdown(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        let mut running = Vec::new();

        for mut task in std::mem::take(&mut self.tasks) {
            match task.outcome() {
                Outcome::Ok => {}
                Outcome::Failed(e) => failures.push(TaskFailure {
                    task: task.label,
                    message: e.to_string(),
                }),
                Outcome::Running => running.push(task),
            }
        }
        self.tasks = running;

        if !failures.is_empty() {
            for failure in &failures {
                error!(task = %failure.task, error = %failure.message, "Task failed");
            }
            self.shutdown();
            return Err(Error::TasksFailed { failures });
        }

        if !self.tasks.is_empty() {
            return Err(Error::TasksPending {
                pending: self.tasks.len(),
            });
        }

        self.shutdown();
        Ok(())
    }

    /// Abort every tracked task; returns false if already shut down
    pub fn shutdown(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        self.shut_down = true;
        for task in &self.tasks {
            task.handle.abort();
        }
        debug!(aborted = self.tasks.len(), "Task runner shut down");
        true
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for BoundedTaskRunner {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.handle.abort();
        }
    }
}

impl std::fmt::Debug for BoundedTaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTaskRunner")
            .field("limit", &self.capacity.limit)
            .field("in_flight", &self.capacity.in_flight())
            .field("tracked", &self.tasks.len())
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

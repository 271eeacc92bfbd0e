//! Task Poller
//!
//! Mutating calls return a task UUID and finish asynchronously on the server.
//! [`wait_for_state`] turns that into a single awaitable result: it re-fetches
//! the task on a fixed cadence until it reaches a target status, fails, the
//! overall timeout passes, or the caller cancels.
//!
//! Pending and target sets are per call site ([`WaitConfig`]), since create,
//! update and delete observe different intermediate statuses.

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::model::{Task, TaskStatus};
use crate::prism::client::PrismClient;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Floor for the poll interval so a zero interval cannot spin
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default delay before the first check
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Default minimum interval between checks
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);

/// Consecutive "unknown UUID" answers tolerated right after task creation
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// Parameters of one wait
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Statuses that mean "keep polling"
    pub pending: Vec<TaskStatus>,
    /// Statuses that mean success
    pub target: Vec<TaskStatus>,
    /// Overall bound on the wait, delay included
    pub timeout: Duration,
    /// Pause before the first check
    pub delay: Duration,
    /// Pause between checks
    pub min_interval: Duration,
    pub not_found_checks: u32,
}

impl WaitConfig {
    pub fn new(pending: Vec<TaskStatus>, target: Vec<TaskStatus>, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            delay: DEFAULT_DELAY,
            min_interval: DEFAULT_MIN_INTERVAL,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
        }
    }

    /// QUEUED / PENDING / RUNNING until SUCCEEDED
    pub fn for_create(timeout: Duration) -> Self {
        Self::new(
            vec![TaskStatus::Queued, TaskStatus::Pending, TaskStatus::Running],
            vec![TaskStatus::Succeeded],
            timeout,
        )
    }

    pub fn for_update(timeout: Duration) -> Self {
        Self::for_create(timeout)
    }

    /// Like create, plus DELETE_PENDING
    pub fn for_delete(timeout: Duration) -> Self {
        Self::new(
            vec![
                TaskStatus::Queued,
                TaskStatus::Pending,
                TaskStatus::Running,
                TaskStatus::DeletePending,
            ],
            vec![TaskStatus::Succeeded],
            timeout,
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }
}

enum Pause {
    Elapsed,
    Deadline,
    Cancelled,
}

/// Sleep for `duration`, cut short by the deadline or cancellation
async fn pause(duration: Duration, deadline: Instant, cancel: &CancellationToken) -> Pause {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Pause::Cancelled,
        _ = sleep_until(deadline) => Pause::Deadline,
        _ = sleep(duration) => Pause::Elapsed,
    }
}

/// Poll `refresh` until the task reaches a terminal outcome.
///
/// Returns the task as last observed when its status is in `config.target`.
/// FAILED / INVALID_UUID become [`Error::TaskFailed`] carrying both the error
/// detail and the progress message. Statuses outside both sets become
/// [`Error::UnexpectedState`]. "Unknown UUID" refresh errors count as pending
/// up to `config.not_found_checks` times in a row; any other refresh error
/// aborts the wait. The server-side task is never cancelled.
pub async fn wait_for_state<F, Fut>(
    task_uuid: &str,
    config: &WaitConfig,
    cancel: &CancellationToken,
    mut refresh: F,
) -> Result<Task>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Task>>,
{
    let deadline = Instant::now() + config.timeout;
    let interval = config.min_interval.max(MIN_POLL_INTERVAL);
    let mut last_status: Option<TaskStatus> = None;
    let mut not_found = 0u32;
    let mut polls = 0u32;

    let timed_out = |last_status: Option<TaskStatus>| Error::Timeout {
        uuid: task_uuid.to_string(),
        timeout: config.timeout,
        last_status,
    };
    let cancelled = || Error::Cancelled {
        uuid: task_uuid.to_string(),
    };

    tracing::debug!(
        "Waiting for task {} (timeout {:?}, interval {:?})",
        task_uuid,
        config.timeout,
        interval
    );

    if !config.delay.is_zero() {
        match pause(config.delay, deadline, cancel).await {
            Pause::Elapsed => {}
            Pause::Deadline => return Err(timed_out(last_status)),
            Pause::Cancelled => return Err(cancelled()),
        }
    }

    loop {
        if Instant::now() >= deadline {
            return Err(timed_out(last_status));
        }

        polls += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = sleep_until(deadline) => return Err(timed_out(last_status)),
            result = refresh() => result,
        };

        match outcome {
            Ok(task) => {
                not_found = 0;

                if task.status.is_failure() {
                    tracing::warn!("Task {} failed: {}", task_uuid, task.failure_message());
                    return Err(Error::TaskFailed {
                        uuid: task_uuid.to_string(),
                        message: task.failure_message(),
                    });
                }

                if config.target.contains(&task.status) {
                    tracing::info!("Task {} reached {} after {} polls", task_uuid, task.status, polls);
                    return Ok(task);
                }

                if !config.pending.contains(&task.status) {
                    return Err(Error::UnexpectedState {
                        uuid: task_uuid.to_string(),
                        status: task.status,
                    });
                }

                tracing::debug!(
                    "Task {} is {} ({}%)",
                    task_uuid,
                    task.status,
                    task.percentage_complete.unwrap_or_default()
                );
                last_status = Some(task.status);
            }
            Err(err) if err.is_unknown_uuid() => {
                not_found += 1;
                if not_found > config.not_found_checks {
                    return Err(err);
                }
                tracing::warn!(
                    "Task {} not visible yet ({}/{}): {}",
                    task_uuid,
                    not_found,
                    config.not_found_checks,
                    err
                );
            }
            Err(err) => return Err(err),
        }

        match pause(interval, deadline, cancel).await {
            Pause::Elapsed => {}
            Pause::Deadline => return Err(timed_out(last_status)),
            Pause::Cancelled => return Err(cancelled()),
        }
    }
}

impl<C: Codec> PrismClient<C> {
    /// Block until the task behind `task_uuid` finishes
    pub async fn wait_for_task(
        &self,
        task_uuid: &str,
        config: &WaitConfig,
        cancel: &CancellationToken,
    ) -> Result<Task> {
        wait_for_state(task_uuid, config, cancel, || self.get_task(task_uuid)).await
    }
}

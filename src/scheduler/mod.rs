//! Task scheduler for model calls.
//!
//! Stage handlers never call the Model Call Service directly: they enqueue
//! typed work items here and poll for results. The scheduler runs a bounded
//! worker pool (default 3 workers) over a priority queue and enforces the
//! capability-combination rule at enqueue time, before anything reaches the
//! model. Schedulers are explicitly constructed and injected into the stage
//! engine; there is no global instance.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::model::{Capability, ModelCallService, ModelRequest, TokenUsage};

/// Interval between result-poll checks.
const POLL_INTERVAL_MS: u64 = 25;

/// Task priority. Higher priorities are dispatched first; FIFO within a
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// Default for stage model calls.
    Medium,
    /// Dispatched ahead of everything else.
    High,
}

/// A work item for the scheduler.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// The model call to execute.
    pub request: ModelRequest,
    /// Queue priority.
    pub priority: Priority,
}

impl TaskRequest {
    /// Create a medium-priority task.
    pub fn new(request: ModelRequest) -> Self {
        Self {
            request,
            priority: Priority::Medium,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Completed task payload.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Completion text.
    pub text: String,
    /// Token usage for the call.
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
enum TaskState {
    Queued,
    Running,
    Done {
        outcome: Result<TaskOutcome, String>,
        // Set on the first successful read; the retention clock starts
        // there, so a completed result is never purged before it has been
        // retrieved at least once.
        retrieved_at: Option<Instant>,
    },
}

struct QueuedTask {
    priority: Priority,
    seq: u64,
    id: String,
    request: ModelRequest,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower sequence number
        self.priority
            .cmp(&other.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

struct SchedulerInner {
    model: Arc<dyn ModelCallService>,
    config: SchedulerConfig,
    queue: Mutex<BinaryHeap<QueuedTask>>,
    states: Mutex<HashMap<String, TaskState>>,
    notify: Notify,
    seq: AtomicU64,
}

/// Bounded-concurrency task scheduler with priority ordering and polling
/// result retrieval.
pub struct TaskScheduler {
    inner: Arc<SchedulerInner>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskScheduler {
    /// Create a scheduler and spawn its worker pool.
    pub fn new(model: Arc<dyn ModelCallService>, config: SchedulerConfig) -> Self {
        let inner = Arc::new(SchedulerInner {
            model,
            config: config.clone(),
            queue: Mutex::new(BinaryHeap::new()),
            states: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
        });

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    worker_loop(worker_id, inner).await;
                })
            })
            .collect();

        info!(workers = config.workers.max(1), "Task scheduler started");

        Self { inner, workers }
    }

    /// Enqueue a task. Fails with `SingleToolRuleViolation` when the
    /// capability combination is invalid; nothing is queued in that case.
    pub fn enqueue(&self, task: TaskRequest) -> SchedulerResult<String> {
        validate_capabilities(&task.request.capabilities)?;

        self.purge_expired();

        let id = Uuid::new_v4().to_string();
        let seq = self.inner.seq.fetch_add(1, AtomicOrdering::Relaxed);

        self.inner
            .states
            .lock()
            .expect("scheduler state lock poisoned")
            .insert(id.clone(), TaskState::Queued);
        self.inner
            .queue
            .lock()
            .expect("scheduler queue lock poisoned")
            .push(QueuedTask {
                priority: task.priority,
                seq,
                id: id.clone(),
                request: task.request,
            });
        self.inner.notify.notify_one();

        debug!(task_id = %id, priority = ?task.priority, "Task enqueued");
        Ok(id)
    }

    /// Poll for a task result.
    ///
    /// Uses the configured default timeout when `timeout_ms` is `None`.
    /// A completed result is kept until its first read, however long that
    /// takes; the retention grace window starts at that read, after which
    /// the result is discarded and later reads see `NotFound`.
    pub async fn get_result(
        &self,
        task_id: &str,
        timeout_ms: Option<u64>,
    ) -> SchedulerResult<TaskOutcome> {
        let timeout = timeout_ms.unwrap_or(self.inner.config.poll_timeout_ms);
        let deadline = Instant::now() + Duration::from_millis(timeout);

        loop {
            self.purge_expired();

            {
                let mut states = self
                    .inner
                    .states
                    .lock()
                    .expect("scheduler state lock poisoned");
                match states.get_mut(task_id) {
                    None => {
                        return Err(SchedulerError::NotFound {
                            task_id: task_id.to_string(),
                        })
                    }
                    Some(TaskState::Done {
                        outcome,
                        retrieved_at,
                    }) => {
                        retrieved_at.get_or_insert_with(Instant::now);
                        return outcome
                            .clone()
                            .map_err(|message| SchedulerError::TaskFailed { message });
                    }
                    Some(TaskState::Queued) | Some(TaskState::Running) => {}
                }
            }

            if Instant::now() >= deadline {
                return Err(SchedulerError::Timeout {
                    timeout_ms: timeout,
                });
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// Number of tasks currently queued (not running or done).
    pub fn queued_count(&self) -> usize {
        self.inner
            .queue
            .lock()
            .expect("scheduler queue lock poisoned")
            .len()
    }

    /// Drop completed results read longer ago than the retention window.
    /// Results that have never been read are exempt.
    fn purge_expired(&self) {
        let retention = Duration::from_millis(self.inner.config.retention_ms);
        let mut states = self
            .inner
            .states
            .lock()
            .expect("scheduler state lock poisoned");
        states.retain(|_, state| match state {
            TaskState::Done {
                retrieved_at: Some(read),
                ..
            } => read.elapsed() < retention,
            _ => true,
        });
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// Enforce the capability-combination rule: the base thinking capability
/// plus at most one additional capability.
pub fn validate_capabilities(capabilities: &[Capability]) -> SchedulerResult<()> {
    if !capabilities.contains(&Capability::Thinking) {
        return Err(SchedulerError::SingleToolRuleViolation {
            message: "base thinking capability is required".to_string(),
        });
    }
    let additional = capabilities.iter().filter(|c| !c.is_base()).count();
    if additional > 1 {
        return Err(SchedulerError::SingleToolRuleViolation {
            message: format!(
                "at most one additional capability allowed, got {}",
                additional
            ),
        });
    }
    Ok(())
}

async fn worker_loop(worker_id: usize, inner: Arc<SchedulerInner>) {
    loop {
        let task = {
            let mut queue = inner.queue.lock().expect("scheduler queue lock poisoned");
            queue.pop()
        };

        let Some(task) = task else {
            inner.notify.notified().await;
            continue;
        };

        {
            let mut states = inner.states.lock().expect("scheduler state lock poisoned");
            states.insert(task.id.clone(), TaskState::Running);
        }

        debug!(worker = worker_id, task_id = %task.id, "Worker picked up task");
        let start = Instant::now();
        let result = inner.model.call(task.request).await;
        let latency = start.elapsed();

        let outcome = match result {
            Ok(response) => {
                debug!(
                    worker = worker_id,
                    task_id = %task.id,
                    latency_ms = latency.as_millis(),
                    "Task completed"
                );
                Ok(TaskOutcome {
                    text: response.text,
                    usage: response.usage,
                })
            }
            Err(e) => {
                warn!(
                    worker = worker_id,
                    task_id = %task.id,
                    error = %e,
                    latency_ms = latency.as_millis(),
                    "Task failed"
                );
                Err(e.to_string())
            }
        };

        let mut states = inner.states.lock().expect("scheduler state lock poisoned");
        states.insert(
            task.id,
            TaskState::Done {
                outcome,
                retrieved_at: None,
            },
        );
    }
}

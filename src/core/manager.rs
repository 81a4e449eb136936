//! # TaskManager: the engine core.
//!
//! Owns the task table, the ready/deferred queues, the result store, and the
//! engine lifecycle (start/stop). The dispatch loop and workers live in
//! sibling modules; everything they mutate funnels through the single
//! [`EngineState`] mutex held here.
//!
//! ## Synchronization discipline
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │  Mutex<EngineState>                          │
//!  add_task ────► │   tasks:    HashMap<TaskId, Task>            │ ◄── dispatch loop
//!  schedule ────► │   ready:    ReadyQueue (priority desc, FIFO) │     (promote + claim)
//!  cancel ──────► │   deferred: DeferredQueue (earliest due)     │ ◄── worker settle
//!  stats/result ► │   results:  HashMap<TaskId, TaskResult>      │
//!                 └──────────────────────────────────────────────┘
//!                        Notify (dispatch wake)  Notify (completions)
//! ```
//!
//! One lock guards every mutation, so a cancellation and a dispatch claim can
//! never race inconsistently: whichever takes the lock first wins, the loser
//! observes the new status. The lock is held only for queue/table operations,
//! never across handler execution.
//!
//! ## Lifecycle
//! - [`TaskManager::start`] spawns the dispatch loop (and the subscriber
//!   listener when subscribers are configured). Idempotent while running.
//! - [`TaskManager::stop`] rejects further submissions, cancels the runtime
//!   token, and waits up to [`EngineConfig::grace`] for in-flight workers.
//!   Tasks still running when grace expires are marked failed (abandoned) and
//!   reported via [`EngineError::GraceExceeded`]. Queued tasks that were never
//!   dispatched simply remain pending in the table.
//! - Submissions after `stop()` are rejected with [`EngineError::Stopped`].
//! - Submissions before `start()` are accepted and sit in the queues until
//!   the dispatch loop begins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::Instant;
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::core::dispatch::dispatch_loop;
use crate::core::stats::TaskStatistics;
use crate::error::{EngineError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::queues::{DeferredQueue, DueEntry, ReadyEntry, ReadyQueue};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{
    HandlerRef, Task, TaskId, TaskOptions, TaskParams, TaskResult, TaskStatus, TaskValue,
};

/// Everything a worker needs to execute one claimed attempt.
pub(crate) struct Claim {
    pub id: TaskId,
    pub task_type: Arc<str>,
    pub handler: HandlerRef,
    pub params: TaskParams,
    pub timeout: Option<Duration>,
    /// Attempt number this claim represents (1-based).
    pub attempt: u32,
}

/// Mutable engine state; every access goes through the one mutex.
pub(crate) struct EngineState {
    pub tasks: HashMap<TaskId, Task>,
    pub ready: ReadyQueue,
    pub deferred: DeferredQueue,
    pub results: HashMap<TaskId, TaskResult>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            ready: ReadyQueue::new(),
            deferred: DeferredQueue::new(),
            results: HashMap::new(),
        }
    }

    /// Moves every due deferred entry into the ready queue.
    ///
    /// Entries whose task was cancelled (or purged) in the meantime are
    /// dropped silently; backoff-retry entries re-enter ready without a
    /// promotion event since they were never `Scheduled`.
    pub fn promote_due(&mut self, now: Instant, bus: &Bus) {
        while let Some(entry) = self.deferred.pop_due(now) {
            let Some(task) = self.tasks.get_mut(&entry.id) else {
                continue;
            };
            match task.status {
                TaskStatus::Scheduled => {
                    task.promote();
                    bus.publish(
                        Event::new(EventKind::TaskPromoted)
                            .with_task(task.id)
                            .with_task_type(task.task_type.clone()),
                    );
                    self.ready.push(ReadyEntry {
                        id: entry.id,
                        priority: task.priority,
                        seq: task.seq,
                    });
                }
                TaskStatus::Pending => {
                    // Retry delay elapsed.
                    self.ready.push(ReadyEntry {
                        id: entry.id,
                        priority: task.priority,
                        seq: task.seq,
                    });
                }
                _ => {}
            }
        }
    }

    /// Claims the highest-priority pending task, skipping stale entries.
    pub fn claim_next(&mut self, now: Instant) -> Option<Claim> {
        while let Some(entry) = self.ready.pop() {
            let Some(task) = self.tasks.get_mut(&entry.id) else {
                continue;
            };
            if task.status != TaskStatus::Pending {
                continue;
            }
            task.claim(now);
            return Some(Claim {
                id: task.id,
                task_type: task.task_type.clone(),
                handler: task.handler.clone(),
                params: task.params.clone(),
                timeout: task.timeout,
                attempt: task.attempts,
            });
        }
        None
    }
}

/// Shared core: configuration, bus, state, and wake-up primitives.
pub(crate) struct EngineInner {
    pub cfg: EngineConfig,
    pub bus: Bus,
    pub state: Mutex<EngineState>,
    /// Wakes the dispatch loop on submissions, retries, and freed workers.
    pub dispatch_notify: Notify,
    /// Wakes `wait_result` callers on every terminal transition.
    pub completion_notify: Notify,
    /// Cleared at stop; submissions check it first.
    pub accepting: AtomicBool,
    /// Monotonic submission counter; FIFO tie-break within equal priority.
    submit_seq: AtomicU64,
}

impl EngineInner {
    /// Inserts a new task into the table and the appropriate queue.
    async fn submit(
        &self,
        task_type: Arc<str>,
        handler: HandlerRef,
        params: TaskParams,
        opts: TaskOptions,
        scheduled_at: Option<Instant>,
    ) -> Result<TaskId, EngineError> {
        if !self.accepting.load(AtomicOrdering::Acquire) {
            return Err(EngineError::Stopped);
        }
        let seq = self.submit_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let task = Task::new(
            task_type.clone(),
            handler,
            params,
            opts.priority,
            opts.retry_count,
            opts.timeout,
            seq,
            scheduled_at,
        );
        let id = task.id;
        let priority = task.priority;

        {
            let mut st = self.state.lock().await;
            match scheduled_at {
                None => {
                    st.ready.push(ReadyEntry { id, priority, seq });
                    self.bus.publish(
                        Event::new(EventKind::TaskSubmitted)
                            .with_task(id)
                            .with_task_type(task_type),
                    );
                }
                Some(at) => {
                    st.deferred.push(DueEntry { id, due: at, seq });
                    self.bus.publish(
                        Event::new(EventKind::TaskScheduled)
                            .with_task(id)
                            .with_task_type(task_type)
                            .with_delay(at.saturating_duration_since(Instant::now())),
                    );
                }
            }
            st.tasks.insert(id, task);
        }
        self.dispatch_notify.notify_one();
        Ok(id)
    }

    /// Applies the outcome of one finished attempt.
    ///
    /// Retryable failures with attempts remaining re-enqueue the task at its
    /// original priority (immediately, or through the deferred queue when a
    /// backoff delay is configured). Everything else is terminal and writes
    /// the task's result record.
    pub async fn settle(&self, id: TaskId, outcome: Result<TaskValue, TaskError>) {
        let now = Instant::now();
        let mut st = self.state.lock().await;
        let Some(task) = st.tasks.get_mut(&id) else {
            return;
        };
        if task.status != TaskStatus::Running {
            // Already abandoned at shutdown; keep the recorded outcome.
            return;
        }
        let task_type = task.task_type.clone();
        let attempt = task.attempts;

        match outcome {
            Ok(value) => {
                task.complete(now);
                let duration = task.duration();
                st.results.insert(
                    id,
                    TaskResult {
                        task_id: id,
                        status: TaskStatus::Completed,
                        value: Some(value),
                        error: None,
                        attempts: attempt,
                        duration,
                    },
                );
                self.bus.publish(
                    Event::new(EventKind::TaskCompleted)
                        .with_task(id)
                        .with_task_type(task_type)
                        .with_attempt(attempt),
                );
                self.completion_notify.notify_waiters();
            }
            Err(err) => {
                if let TaskError::Timeout { timeout } = &err {
                    self.bus.publish(
                        Event::new(EventKind::TimeoutHit)
                            .with_task(id)
                            .with_task_type(task_type.clone())
                            .with_attempt(attempt)
                            .with_timeout(*timeout),
                    );
                }
                self.bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_task(id)
                        .with_task_type(task_type.clone())
                        .with_attempt(attempt)
                        .with_reason(err.to_string()),
                );

                let accepting = self.accepting.load(AtomicOrdering::Acquire);
                if err.is_retryable() && task.has_attempts_left() && accepting {
                    task.retry();
                    let priority = task.priority;
                    let seq = task.seq;
                    let delay = self.cfg.retry_backoff.next(attempt.saturating_sub(1));
                    self.bus.publish(
                        Event::new(EventKind::RetryScheduled)
                            .with_task(id)
                            .with_task_type(task_type)
                            .with_attempt(attempt)
                            .with_delay(delay),
                    );
                    if delay.is_zero() {
                        st.ready.push(ReadyEntry { id, priority, seq });
                    } else {
                        st.deferred.push(DueEntry {
                            id,
                            due: now + delay,
                            seq,
                        });
                    }
                    self.dispatch_notify.notify_one();
                } else {
                    task.fail(now);
                    let duration = task.duration();
                    st.results.insert(
                        id,
                        TaskResult {
                            task_id: id,
                            status: TaskStatus::Failed,
                            value: None,
                            error: Some(err),
                            attempts: attempt,
                            duration,
                        },
                    );
                    self.completion_notify.notify_waiters();
                }
            }
        }
    }

    /// Marks every still-running task failed (abandoned at shutdown).
    ///
    /// Called after the grace period expires; returns the abandoned ids.
    pub async fn abandon_running(&self) -> Vec<TaskId> {
        let now = Instant::now();
        let mut st = self.state.lock().await;
        let running: Vec<TaskId> = st
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Running)
            .map(|t| t.id)
            .collect();

        for id in &running {
            let Some(task) = st.tasks.get_mut(id) else {
                continue;
            };
            task.fail(now);
            let task_type = task.task_type.clone();
            let attempts = task.attempts;
            let duration = task.duration();
            st.results.insert(
                *id,
                TaskResult {
                    task_id: *id,
                    status: TaskStatus::Failed,
                    value: None,
                    error: Some(TaskError::Canceled),
                    attempts,
                    duration,
                },
            );
            self.bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task(*id)
                    .with_task_type(task_type)
                    .with_attempt(attempts)
                    .with_reason("abandoned at shutdown"),
            );
        }
        if !running.is_empty() {
            self.completion_notify.notify_waiters();
        }
        running
    }
}

/// Engine run phase, guarded by a std mutex (never held across await).
enum Phase {
    Idle,
    Running(RunState),
    Stopped,
}

struct RunState {
    token: CancellationToken,
    listener_token: CancellationToken,
    dispatch: JoinHandle<Result<(), EngineError>>,
    listener: Option<JoinHandle<()>>,
}

/// The engine core: owns tasks, queues, results, and the dispatch lifecycle.
///
/// Collaborators normally go through the [`Scheduler`](crate::Scheduler)
/// facade; the manager is the direct-handler surface (`add_task` takes a
/// [`HandlerRef`] instead of a registered type name).
pub struct TaskManager {
    inner: Arc<EngineInner>,
    phase: StdMutex<Phase>,
    subscribers: StdMutex<Vec<Arc<dyn Subscribe>>>,
}

impl TaskManager {
    /// Creates a manager with no subscribers.
    pub fn new(cfg: EngineConfig) -> Self {
        Self::with_subscribers(cfg, Vec::new())
    }

    /// Creates a manager that will fan lifecycle events out to `subscribers`
    /// once started.
    pub fn with_subscribers(cfg: EngineConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            inner: Arc::new(EngineInner {
                cfg,
                bus,
                state: Mutex::new(EngineState::new()),
                dispatch_notify: Notify::new(),
                completion_notify: Notify::new(),
                accepting: AtomicBool::new(true),
                submit_seq: AtomicU64::new(0),
            }),
            phase: StdMutex::new(Phase::Idle),
            subscribers: StdMutex::new(subscribers),
        }
    }

    /// Engine configuration (defaults applied to submissions).
    pub fn config(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    /// Event bus handle; subscribe for observability or test assertions.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Begins the dispatch loop; must be called from within a tokio runtime.
    ///
    /// Idempotent while running. Returns [`EngineError::Stopped`] once the
    /// engine has been stopped — an engine instance runs one lifecycle.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut phase = self.phase.lock().expect("phase lock poisoned");
        match &*phase {
            Phase::Running(_) => Ok(()),
            Phase::Stopped => Err(EngineError::Stopped),
            Phase::Idle => {
                let token = CancellationToken::new();
                let listener_token = CancellationToken::new();
                let semaphore = match self.inner.cfg.max_workers {
                    0 => None,
                    n => Some(Arc::new(Semaphore::new(n))),
                };
                let listener = self.spawn_listener(&listener_token);
                let dispatch = tokio::spawn(dispatch_loop(
                    Arc::clone(&self.inner),
                    token.clone(),
                    semaphore,
                ));
                *phase = Phase::Running(RunState {
                    token,
                    listener_token,
                    dispatch,
                    listener,
                });
                Ok(())
            }
        }
    }

    /// Winds the engine down.
    ///
    /// 1. New submissions are rejected from this point on.
    /// 2. The runtime token is cancelled; handlers observe their child token.
    /// 3. In-flight workers get up to [`EngineConfig::grace`] to finish and
    ///    record their real outcome.
    /// 4. Tasks still running after grace are marked failed (abandoned) and
    ///    returned in [`EngineError::GraceExceeded`].
    ///
    /// Queued tasks that were never dispatched remain pending in the table
    /// (visible through statistics). Idempotent: repeated calls return `Ok`.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let run = {
            let mut phase = self.phase.lock().expect("phase lock poisoned");
            match std::mem::replace(&mut *phase, Phase::Stopped) {
                Phase::Running(rs) => Some(rs),
                _ => None,
            }
        };
        self.inner.accepting.store(false, AtomicOrdering::Release);
        let Some(rs) = run else {
            return Ok(());
        };

        self.inner.bus.publish(Event::new(EventKind::ShutdownRequested));
        rs.token.cancel();
        let res = match rs.dispatch.await {
            Ok(r) => r,
            // Dispatch panicking is a bug, but stop() should still wind down.
            Err(_join) => Ok(()),
        };

        rs.listener_token.cancel();
        if let Some(listener) = rs.listener {
            let _ = listener.await;
        }
        res
    }

    /// True while the dispatch loop is running.
    pub fn is_running(&self) -> bool {
        matches!(
            &*self.phase.lock().expect("phase lock poisoned"),
            Phase::Running(_)
        )
    }

    /// Submits an immediately-ready task; returns without waiting for
    /// execution.
    pub async fn add_task(
        &self,
        task_type: impl Into<Arc<str>>,
        handler: HandlerRef,
        params: TaskParams,
        opts: TaskOptions,
    ) -> Result<TaskId, EngineError> {
        self.inner
            .submit(task_type.into(), handler, params, opts, None)
            .await
    }

    /// Submits a task that must not run before `at`.
    ///
    /// Fails with [`EngineError::ScheduleInPast`] when `at` already passed.
    pub async fn schedule_task(
        &self,
        task_type: impl Into<Arc<str>>,
        handler: HandlerRef,
        params: TaskParams,
        opts: TaskOptions,
        at: Instant,
    ) -> Result<TaskId, EngineError> {
        let now = Instant::now();
        if at < now {
            return Err(EngineError::ScheduleInPast { past_by: now - at });
        }
        self.inner
            .submit(task_type.into(), handler, params, opts, Some(at))
            .await
    }

    /// Convenience: schedules a task `delay` from now.
    pub async fn schedule_task_in(
        &self,
        task_type: impl Into<Arc<str>>,
        handler: HandlerRef,
        params: TaskParams,
        opts: TaskOptions,
        delay: Duration,
    ) -> Result<TaskId, EngineError> {
        self.schedule_task(task_type, handler, params, opts, Instant::now() + delay)
            .await
    }

    /// Cancels a task that has not been claimed yet.
    ///
    /// Returns `true` only for tasks that were `Pending` or `Scheduled`;
    /// `false` (without error) for running, terminal, or unknown tasks. A
    /// task claimed just before this call loses the race and runs to
    /// completion.
    pub async fn cancel_task(&self, id: TaskId) -> bool {
        let now = Instant::now();
        let mut st = self.inner.state.lock().await;
        let Some(task) = st.tasks.get_mut(&id) else {
            return false;
        };
        if !task.cancel(now) {
            return false;
        }
        let task_type = task.task_type.clone();
        let attempts = task.attempts;
        st.results.insert(
            id,
            TaskResult {
                task_id: id,
                status: TaskStatus::Cancelled,
                value: None,
                error: None,
                attempts,
                duration: Duration::ZERO,
            },
        );
        self.inner.bus.publish(
            Event::new(EventKind::TaskCancelled)
                .with_task(id)
                .with_task_type(task_type),
        );
        self.inner.completion_notify.notify_waiters();
        true
    }

    /// Non-blocking read of a task's terminal result.
    ///
    /// `None` means the task is unknown **or** not yet terminal; pair with
    /// [`TaskManager::task_status`] to distinguish.
    pub async fn task_result(&self, id: TaskId) -> Option<TaskResult> {
        self.inner.state.lock().await.results.get(&id).cloned()
    }

    /// Blocks until the task reaches a terminal state, then returns its
    /// result. Returns `None` immediately for unknown (or purged) ids.
    pub async fn wait_result(&self, id: TaskId) -> Option<TaskResult> {
        loop {
            let notified = self.inner.completion_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let st = self.inner.state.lock().await;
                if let Some(result) = st.results.get(&id) {
                    return Some(result.clone());
                }
                if !st.tasks.contains_key(&id) {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Current lifecycle state of a task, if known.
    pub async fn task_status(&self, id: TaskId) -> Option<TaskStatus> {
        self.inner
            .state
            .lock()
            .await
            .tasks
            .get(&id)
            .map(|t| t.status)
    }

    /// Point-in-time snapshot of task counts; never fails, all-zero on an
    /// empty engine.
    pub async fn statistics(&self) -> TaskStatistics {
        let st = self.inner.state.lock().await;
        TaskStatistics::tally(st.tasks.values().map(|t| t.status))
    }

    /// Drops terminal tasks and their results; returns how many were evicted.
    ///
    /// The engine performs no automatic eviction — long-running hosts call
    /// this at their own retention cadence.
    pub async fn clear_finished(&self) -> usize {
        let mut st = self.inner.state.lock().await;
        let before = st.tasks.len();
        st.tasks.retain(|_, t| !t.status.is_terminal());
        st.results.clear();
        before - st.tasks.len()
    }

    /// Spawns the bus → subscriber-set forwarding loop, if any subscribers
    /// were configured. On shutdown the listener drains events already
    /// buffered in the channel before closing subscriber queues.
    fn spawn_listener(&self, listener_token: &CancellationToken) -> Option<JoinHandle<()>> {
        let subs = std::mem::take(&mut *self.subscribers.lock().expect("subscribers lock"));
        if subs.is_empty() {
            return None;
        }
        let set = SubscriberSet::new(subs);
        let mut rx = self.inner.bus.subscribe();
        let token = listener_token.clone();

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::HandlerFn;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick(value: i64) -> HandlerRef {
        HandlerFn::arc(move |_ctx, _p| async move { Ok(json!(value)) })
    }

    fn opts() -> TaskOptions {
        TaskOptions::default()
    }

    #[tokio::test]
    async fn add_task_runs_to_completion() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();

        let id = mgr
            .add_task("answer", quick(42), TaskParams::new(), opts())
            .await
            .unwrap();
        let result = mgr.wait_result(id).await.expect("result");
        assert!(result.is_success());
        assert_eq!(result.value, Some(json!(42)));
        assert_eq!(result.attempts, 1);

        mgr.stop().await.unwrap();
    }

    #[tokio::test]
    async fn submissions_before_start_are_queued() {
        let mgr = TaskManager::new(EngineConfig::default());
        let id = mgr
            .add_task("early", quick(1), TaskParams::new(), opts())
            .await
            .unwrap();
        assert_eq!(mgr.task_status(id).await, Some(TaskStatus::Pending));

        mgr.start().unwrap();
        let result = mgr.wait_result(id).await.expect("result");
        assert!(result.is_success());
        mgr.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_rejects_submissions() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();
        mgr.start().unwrap();
        assert!(mgr.is_running());

        mgr.stop().await.unwrap();
        mgr.stop().await.unwrap();
        assert!(!mgr.is_running());

        let err = mgr
            .add_task("late", quick(1), TaskParams::new(), opts())
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "engine_stopped");
        assert!(matches!(mgr.start(), Err(EngineError::Stopped)));
    }

    #[tokio::test]
    async fn failing_task_retries_until_exhausted() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let handler: HandlerRef = HandlerFn::arc(move |_ctx, _p| {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TaskError::fail("always broken"))
            }
        });

        let id = mgr
            .add_task(
                "flaky",
                handler,
                TaskParams::new(),
                opts().with_retry_count(3),
            )
            .await
            .unwrap();
        let result = mgr.wait_result(id).await.expect("result");

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.error_label(), Some("task_failed"));

        mgr.stop().await.unwrap();
    }

    #[tokio::test]
    async fn fatal_error_short_circuits_retries() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let handler: HandlerRef = HandlerFn::arc(move |_ctx, _p| {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TaskError::fatal("bad input"))
            }
        });

        let id = mgr
            .add_task(
                "doomed",
                handler,
                TaskParams::new(),
                opts().with_retry_count(5),
            )
            .await
            .unwrap();
        let result = mgr.wait_result(id).await.expect("result");

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.attempts, 1, "fatal errors are not retried");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.error_label(), Some("task_fatal"));

        mgr.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_recorded_distinctly() {
        let mut cfg = EngineConfig::default();
        cfg.timeout = Duration::from_millis(50);
        let mgr = TaskManager::new(cfg);
        mgr.start().unwrap();

        let handler: HandlerRef = HandlerFn::arc(|_ctx, _p| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!(null))
        });

        let id = mgr
            .add_task(
                "sleepy",
                handler,
                TaskParams::new(),
                TaskOptions::with_defaults(mgr.config()),
            )
            .await
            .unwrap();
        let result = mgr.wait_result(id).await.expect("result");

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error_label(), Some("task_timeout"));

        mgr.stop().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_pending_task_before_start() {
        let mgr = TaskManager::new(EngineConfig::default());
        let id = mgr
            .add_task("victim", quick(0), TaskParams::new(), opts())
            .await
            .unwrap();

        assert!(mgr.cancel_task(id).await);
        assert_eq!(mgr.task_status(id).await, Some(TaskStatus::Cancelled));
        // Second cancel and cancel of unknown ids are clean no-ops.
        assert!(!mgr.cancel_task(id).await);
        assert!(!mgr.cancel_task(TaskId::new()).await);

        let result = mgr.wait_result(id).await.expect("cancelled result");
        assert_eq!(result.status, TaskStatus::Cancelled);
        assert_eq!(result.attempts, 0);
    }

    #[tokio::test]
    async fn cancel_completed_task_returns_false() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();

        let id = mgr
            .add_task("done", quick(7), TaskParams::new(), opts())
            .await
            .unwrap();
        mgr.wait_result(id).await.expect("result");
        assert!(!mgr.cancel_task(id).await);

        mgr.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_task_waits_for_its_instant() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();

        let id = mgr
            .schedule_task_in(
                "later",
                quick(9),
                TaskParams::new(),
                opts(),
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        // Well before the scheduled instant: still scheduled, not dispatched.
        tokio::time::sleep(Duration::from_secs(1800)).await;
        assert_eq!(mgr.task_status(id).await, Some(TaskStatus::Scheduled));
        assert_eq!(mgr.statistics().await.scheduled, 1);

        // After the instant passes it is promoted, dispatched, and completed.
        let result = mgr.wait_result(id).await.expect("result");
        assert!(result.is_success());

        mgr.stop().await.unwrap();
    }

    #[tokio::test]
    async fn schedule_in_past_is_rejected() {
        let mgr = TaskManager::new(EngineConfig::default());
        let past = Instant::now() - Duration::from_secs(5);
        let err = mgr
            .schedule_task("late", quick(0), TaskParams::new(), opts(), past)
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "schedule_in_past");
    }

    #[tokio::test]
    async fn statistics_sum_to_total() {
        let mgr = TaskManager::new(EngineConfig::default());

        // Two pending, one scheduled, one cancelled — engine not started, so
        // nothing moves underneath the assertions.
        mgr.add_task("a", quick(0), TaskParams::new(), opts())
            .await
            .unwrap();
        mgr.add_task("b", quick(0), TaskParams::new(), opts())
            .await
            .unwrap();
        mgr.schedule_task_in(
            "c",
            quick(0),
            TaskParams::new(),
            opts(),
            Duration::from_secs(600),
        )
        .await
        .unwrap();
        let victim = mgr
            .add_task("d", quick(0), TaskParams::new(), opts())
            .await
            .unwrap();
        mgr.cancel_task(victim).await;

        let stats = mgr.statistics().await;
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(
            stats.pending
                + stats.scheduled
                + stats.running
                + stats.completed
                + stats.failed
                + stats.cancelled,
            stats.total
        );
    }

    #[tokio::test]
    async fn empty_engine_statistics_are_zero() {
        let mgr = TaskManager::new(EngineConfig::default());
        assert_eq!(mgr.statistics().await, TaskStatistics::default());
    }

    #[tokio::test]
    async fn clear_finished_evicts_terminal_tasks() {
        let mgr = TaskManager::new(EngineConfig::default());
        mgr.start().unwrap();

        let done = mgr
            .add_task("done", quick(1), TaskParams::new(), opts())
            .await
            .unwrap();
        mgr.wait_result(done).await.unwrap();
        let keep = mgr
            .schedule_task_in(
                "keep",
                quick(2),
                TaskParams::new(),
                opts(),
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert_eq!(mgr.clear_finished().await, 1);
        assert_eq!(mgr.task_status(done).await, None);
        assert!(mgr.task_result(done).await.is_none());
        assert_eq!(mgr.task_status(keep).await, Some(TaskStatus::Scheduled));
        assert_eq!(mgr.statistics().await.total, 1);

        mgr.stop().await.unwrap();
    }

    #[tokio::test]
    async fn wait_result_for_unknown_id_returns_none() {
        let mgr = TaskManager::new(EngineConfig::default());
        assert!(mgr.wait_result(TaskId::new()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_abandons_stuck_tasks_after_grace() {
        let mut cfg = EngineConfig::default();
        cfg.grace = Duration::from_millis(100);
        let mgr = TaskManager::new(cfg);
        mgr.start().unwrap();

        // Ignores its cancellation token on purpose.
        let handler: HandlerRef = HandlerFn::arc(|_ctx, _p| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!(null))
        });
        let id = mgr
            .add_task("stubborn", handler, TaskParams::new(), opts())
            .await
            .unwrap();

        // Let the worker claim it before stopping.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(mgr.task_status(id).await, Some(TaskStatus::Running));

        let err = mgr.stop().await.unwrap_err();
        match err {
            EngineError::GraceExceeded { stuck, .. } => assert_eq!(stuck, vec![id]),
            other => panic!("expected GraceExceeded, got {other:?}"),
        }

        let result = mgr.task_result(id).await.expect("abandoned result");
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error_label(), Some("task_canceled"));
    }

    #[tokio::test]
    async fn stop_waits_for_cooperative_tasks() {
        let mut cfg = EngineConfig::default();
        cfg.grace = Duration::from_secs(5);
        let mgr = TaskManager::new(cfg);
        mgr.start().unwrap();

        // Runs until shutdown cancellation, then exits cleanly.
        let handler: HandlerRef = HandlerFn::arc(|ctx: CancellationToken, _p| async move {
            ctx.cancelled().await;
            Ok(json!("wound down"))
        });
        let id = mgr
            .add_task("cooperative", handler, TaskParams::new(), opts())
            .await
            .unwrap();

        // Give the worker a chance to claim before stopping.
        tokio::task::yield_now().await;
        while mgr.task_status(id).await != Some(TaskStatus::Running) {
            tokio::task::yield_now().await;
        }

        mgr.stop().await.unwrap();
        let result = mgr.task_result(id).await.expect("result");
        assert!(result.is_success(), "cooperative task records its outcome");
    }
}

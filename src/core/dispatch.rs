//! # Dispatch loop: promotion, claiming, and bounded worker spawning.
//!
//! One loop drives all execution:
//!
//! ```text
//! loop {
//!   ├─► reap finished workers (non-blocking)
//!   ├─► lock state:
//!   │     ├─► promote due deferred tasks → ready queue
//!   │     ├─► try_acquire worker permit (max_workers cap)
//!   │     └─► claim highest-priority pending task
//!   ├─► claimed? publish TaskStarting, spawn worker, continue
//!   └─► otherwise wait for the first of:
//!         - dispatch notify (submission / retry / freed worker)
//!         - the next deferred due instant
//!         - runtime cancellation (stop)
//! }
//! // on cancellation: wait for in-flight workers up to the grace period,
//! // then mark stragglers abandoned and abort them.
//! ```
//!
//! ## Rules
//! - At most `max_workers` tasks are `Running` at any instant; the permit is
//!   taken **before** the claim, so a task's status only becomes `Running`
//!   when a worker slot is actually free.
//! - The state lock is held only for queue operations, never across handler
//!   execution or any await.
//! - A worker failure never breaks the loop; outcomes are applied by
//!   [`EngineInner::settle`] in the worker task itself.

use std::sync::Arc;

use tokio::sync::{Semaphore, TryAcquireError};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::manager::EngineInner;
use crate::core::worker::run_attempt;
use crate::error::EngineError;
use crate::events::{Event, EventKind};

/// Runs until the token is cancelled, then drains workers within the grace
/// period. Returns [`EngineError::GraceExceeded`] when stragglers had to be
/// abandoned.
pub(crate) async fn dispatch_loop(
    inner: Arc<EngineInner>,
    token: CancellationToken,
    semaphore: Option<Arc<Semaphore>>,
) -> Result<(), EngineError> {
    let mut workers: JoinSet<()> = JoinSet::new();

    loop {
        if token.is_cancelled() {
            break;
        }
        while workers.try_join_next().is_some() {}

        // Created before touching state: a notify_one() landing while the
        // lock is held leaves a stored permit the later await consumes.
        let wakeup = inner.dispatch_notify.notified();

        let now = Instant::now();
        let (claimed, next_due) = {
            let mut st = inner.state.lock().await;
            st.promote_due(now, &inner.bus);

            let permit = match &semaphore {
                Some(sem) => match sem.clone().try_acquire_owned() {
                    Ok(p) => Some(Some(p)),
                    Err(TryAcquireError::NoPermits) => None,
                    Err(TryAcquireError::Closed) => None,
                },
                None => Some(None),
            };

            match permit {
                Some(permit) => match st.claim_next(now) {
                    Some(claim) => (Some((claim, permit)), None),
                    // Unused permit drops here; workers were not saturated.
                    None => (None, st.deferred.next_due()),
                },
                None => (None, st.deferred.next_due()),
            }
        };

        if let Some((claim, permit)) = claimed {
            inner.bus.publish(
                Event::new(EventKind::TaskStarting)
                    .with_task(claim.id)
                    .with_task_type(claim.task_type.clone())
                    .with_attempt(claim.attempt),
            );
            let inner = Arc::clone(&inner);
            let attempt_token = token.child_token();
            workers.spawn(async move {
                let outcome = run_attempt(
                    claim.handler.clone(),
                    claim.params,
                    &attempt_token,
                    claim.timeout,
                )
                .await;
                inner.settle(claim.id, outcome).await;
                drop(permit);
                inner.dispatch_notify.notify_one();
            });
            continue;
        }

        tokio::pin!(wakeup);
        match next_due {
            Some(due) => tokio::select! {
                _ = &mut wakeup => {}
                _ = time::sleep_until(due) => {}
                _ = token.cancelled() => break,
            },
            None => tokio::select! {
                _ = &mut wakeup => {}
                _ = token.cancelled() => break,
            },
        }
    }

    drain_with_grace(&inner, &mut workers).await
}

/// Waits for in-flight workers within [`EngineConfig::grace`]; on timeout,
/// marks still-running tasks abandoned and aborts their workers.
///
/// [`EngineConfig::grace`]: crate::EngineConfig::grace
async fn drain_with_grace(
    inner: &Arc<EngineInner>,
    workers: &mut JoinSet<()>,
) -> Result<(), EngineError> {
    let grace = inner.cfg.grace;
    let done = async {
        while workers.join_next().await.is_some() {}
    };

    match time::timeout(grace, done).await {
        Ok(()) => {
            inner.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        }
        Err(_) => {
            let stuck = inner.abandon_running().await;
            inner.bus.publish(Event::new(EventKind::GraceExceeded));
            workers.abort_all();
            Err(EngineError::GraceExceeded { grace, stuck })
        }
    }
}

//! # Example: priority_and_retry
//!
//! Demonstrates dispatch ordering and bounded retry.
//!
//! Shows how to:
//! - Submit tasks with different priorities and watch dispatch order
//! - Configure a per-task retry budget with [`TaskOptions`]
//! - Observe a flaky task recovering and an always-broken task exhausting
//!   its attempts
//!
//! ## Run
//! ```bash
//! cargo run --example priority_and_retry --features logging
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use taskforge::{EngineConfig, LogWriter, Scheduler, TaskError, TaskOptions, TaskParams};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== priority_and_retry example ===\n");

    // Single worker so priority ordering is directly observable.
    let mut cfg = EngineConfig::default();
    cfg.max_workers = 1;

    let scheduler = Scheduler::builder(cfg)
        .with_subscriber(Arc::new(LogWriter))
        .build();

    scheduler.register_fn("announce", |_ctx, params: TaskParams| async move {
        let label = params.arg(0).and_then(|v| v.as_str()).unwrap_or("?").to_string();
        println!("[announce] running: {label}");
        Ok(json!(label))
    });

    // Fails twice, then succeeds.
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts2 = Arc::clone(&attempts);
    scheduler.register_fn("flaky-fetch", move |_ctx, _params| {
        let attempts = Arc::clone(&attempts2);
        async move {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TaskError::fail("upstream hiccup"))
            } else {
                Ok(json!("fetched"))
            }
        }
    });

    // Never succeeds.
    scheduler.register_fn("always-broken", |_ctx, _params| async move {
        Err(TaskError::fail("this one is hopeless"))
    });

    // Submit before start: all three announcements are simultaneously ready,
    // so the priority order decides who runs first.
    let mut announced = Vec::new();
    for (label, priority) in [("low", 1), ("urgent", 10), ("normal", 5)] {
        let id = scheduler
            .create_task_with(
                "announce",
                TaskParams::new().with_arg(json!(label)),
                TaskOptions::default().with_priority(priority),
            )
            .await?;
        announced.push(id);
    }

    let flaky = scheduler
        .create_task_with(
            "flaky-fetch",
            TaskParams::new(),
            TaskOptions::default().with_retry_count(5),
        )
        .await?;
    let doomed = scheduler
        .create_task_with(
            "always-broken",
            TaskParams::new(),
            TaskOptions::default().with_retry_count(3),
        )
        .await?;

    scheduler.start()?;

    for id in announced {
        scheduler.wait_result(id).await.expect("announce result");
    }

    let flaky_result = scheduler.wait_result(flaky).await.expect("flaky result");
    println!(
        "\n[main] flaky-fetch: status={} attempts={} value={:?}",
        flaky_result.status.as_label(),
        flaky_result.attempts,
        flaky_result.value
    );

    let doomed_result = scheduler.wait_result(doomed).await.expect("doomed result");
    println!(
        "[main] always-broken: status={} attempts={} error={:?}",
        doomed_result.status.as_label(),
        doomed_result.attempts,
        doomed_result.error.as_ref().map(|e| e.to_string())
    );

    let stats = scheduler.get_task_statistics().await;
    println!(
        "\n[main] statistics: total={} completed={} failed={}",
        stats.total, stats.completed, stats.failed
    );

    scheduler.stop().await?;
    println!("\n=== example completed successfully ===");
    Ok(())
}

//! # Example: bounded_workers
//!
//! Demonstrates the worker pool concurrency cap and deferred scheduling.
//!
//! Shows how to:
//! - Bound concurrent execution with `max_workers`
//! - Schedule a task for a future instant and watch it stay `Scheduled`
//! - Read point-in-time statistics while work is in flight
//!
//! ## Run
//! ```bash
//! cargo run --example bounded_workers
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskforge::{EngineConfig, Scheduler, TaskParams};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== bounded_workers example ===\n");

    let mut cfg = EngineConfig::default();
    cfg.max_workers = 2;
    let scheduler = Scheduler::new(cfg);

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (running2, peak2) = (Arc::clone(&running), Arc::clone(&peak));

    scheduler.register_fn("simulate-io", move |_ctx, params: TaskParams| {
        let running = Arc::clone(&running2);
        let peak = Arc::clone(&peak2);
        async move {
            let n = params.arg(0).and_then(|v| v.as_u64()).unwrap_or(0);
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            println!("[simulate-io] #{n} started ({now} in flight)");
            tokio::time::sleep(Duration::from_millis(300)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(json!(n))
        }
    });

    scheduler.start()?;

    // Five immediate tasks through two worker slots: three waves of ~300ms.
    let mut ids = Vec::new();
    for n in 0..5u64 {
        ids.push(
            scheduler
                .create_task("simulate-io", TaskParams::new().with_arg(json!(n)))
                .await?,
        );
    }

    // One deferred task; it must not run before its instant.
    let deferred = scheduler
        .schedule_task_in("simulate-io", TaskParams::new().with_arg(json!(99)), Duration::from_secs(2))
        .await?;

    let stats = scheduler.get_task_statistics().await;
    println!(
        "\n[main] snapshot: total={} pending={} scheduled={} running={}\n",
        stats.total, stats.pending, stats.scheduled, stats.running
    );

    for id in ids {
        scheduler.wait_result(id).await.expect("result");
    }
    println!(
        "\n[main] immediate batch done; peak concurrency = {}",
        peak.load(Ordering::SeqCst)
    );

    let result = scheduler.wait_result(deferred).await.expect("deferred result");
    println!("[main] deferred task finished: value={:?}", result.value);

    scheduler.stop().await?;
    println!("\n=== example completed successfully ===");
    Ok(())
}

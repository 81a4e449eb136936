//! # Example: basic_flow
//!
//! Demonstrates the simplest end-to-end path through the engine.
//!
//! Shows how to:
//! - Register a handler under a task type name
//! - Submit a task with parameters and await its result
//! - Watch lifecycle events via the built-in [`LogWriter`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Scheduler::builder(cfg).with_subscriber(LogWriter).build()
//!   ├─► register_fn("double", …)
//!   ├─► start()
//!   ├─► create_task("double", {x: 21})
//!   │     ├─► [submitted] → [starting] → [completed] on stdout
//!   ├─► wait_result(id) → value == 42
//!   └─► stop()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_flow --features logging
//! ```

use std::sync::Arc;

use serde_json::json;
use taskforge::{EngineConfig, LogWriter, Scheduler, TaskParams};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== basic_flow example ===\n");

    // 1. Configure the engine
    let mut cfg = EngineConfig::default();
    cfg.max_workers = 2;

    // 2. Build the scheduler with the demo log subscriber
    let scheduler = Scheduler::builder(cfg)
        .with_subscriber(Arc::new(LogWriter))
        .build();

    // 3. Register a handler under a stable name
    scheduler.register_fn("double", |_ctx, params: TaskParams| async move {
        let x = params.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(json!(x * 2))
    });

    // 4. Start dispatching
    scheduler.start()?;

    // 5. Submit work by name and await the outcome
    let id = scheduler
        .create_task("double", TaskParams::new().with_kwarg("x", json!(21)))
        .await?;
    println!("[main] submitted task {id}");

    let result = scheduler.wait_result(id).await.expect("terminal result");
    println!(
        "[main] status={} value={:?} attempts={}",
        result.status.as_label(),
        result.value,
        result.attempts
    );
    assert_eq!(result.value, Some(json!(42)));

    // 6. Wind down
    scheduler.stop().await?;
    println!("\n=== example completed successfully ===");
    Ok(())
}

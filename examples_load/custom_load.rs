use std::time::Instant;

use serde_json::json;

use evlog::noop_drain::NoopDrain;
use evlog::writer::DiscardWriter;
use evlog::{EnvironmentContext, Logger, LoggerConfig, RequestMeta};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = LoggerConfig::new(EnvironmentContext::new("load-test", "production"));
    config.pretty = false;
    // Small queue: bursts beyond it are dropped instead of slowing requests.
    config.drain_buffer = 64;

    let logger = Logger::builder(config)
        .writer(DiscardWriter)
        .drain(NoopDrain)
        .drain(NoopDrain)
        .build()?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let log = logger.request(RequestMeta::new("POST", "/api/orders"), [("x-request-id", "r")]);
        log.set(json!({"order": {"id": i, "total": 4999}}));
        log.emit();
    }

    let elapsed = start.elapsed();
    println!(
        "custom config: emitted {} wide events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    let stats = logger.drain_stats();
    println!(
        "enqueued={} dropped={} delivered={} failed={}",
        stats.enqueued, stats.dropped, stats.delivered, stats.failed
    );
    Ok(())
}

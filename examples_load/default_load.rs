use std::time::Instant;

use serde_json::json;

use evlog::noop_drain::NoopDrain;
use evlog::writer::DiscardWriter;
use evlog::{Logger, LoggerConfig, RequestMeta};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::builder(LoggerConfig::default())
        .writer(DiscardWriter)
        .drain(NoopDrain)
        .build()?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let log = logger.request(
            RequestMeta::new("GET", "/api/items").with_request_id(format!("req-{}", i)),
            [("user-agent", "load-test"), ("authorization", "Bearer secret")],
        );
        log.set(json!({"user": {"id": i}}));
        log.set(json!({"user": {"plan": "free"}, "items": 3}));
        log.finish(200);
    }

    let elapsed = start.elapsed();
    println!(
        "default config: emitted {} wide events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give the drain worker a moment to catch up before reporting.
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    println!("drain stats: {:?}", logger.drain_stats());
    Ok(())
}

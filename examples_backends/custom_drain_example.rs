use std::error::Error;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{sleep, Duration};

use evlog::init::init_tracing;
use evlog::scope::{scope, use_logger};
use evlog::{DrainContext, DrainHook, EvlogError, ErrorOptions, Logger, LoggerConfig, RequestMeta};

/// Example of forwarding wide events to a custom destination by
/// implementing `DrainHook` directly. Imagine this talks to some
/// proprietary analytics service; here it just prints the payload.
struct PrintDrain;

#[async_trait]
impl DrainHook for PrintDrain {
    async fn drain(&self, ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("[DRAIN] {}", serde_json::to_string_pretty(ctx)?);
        Ok(())
    }
}

async fn checkout() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log = use_logger()?;
    log.set(json!({"user": {"id": "user_456", "plan": "free"}, "action": "checkout"}));
    sleep(Duration::from_millis(50)).await;

    // Fields of `tracing` events inside the scope land on the wide event.
    tracing::info!(cart.items = 3, cart.total = 9999);

    Err(EvlogError::from(
        ErrorOptions::new("Payment processing failed")
            .why("Card declined by issuer")
            .fix("Try a different payment method"),
    )
    .into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing()?;

    let logger = Logger::builder(LoggerConfig::from_env())
        .drain(PrintDrain)
        .build()?;

    let log = logger.request(
        RequestMeta::new("POST", "/api/checkout").with_request_id("req-123"),
        [
            ("content-type", "application/json"),
            ("authorization", "Bearer secret-token"),
            ("x-posthog-session-id", "ph-session-123"),
        ],
    );

    match scope(log.clone(), checkout()).await {
        Ok(()) => log.finish(200),
        Err(err) => log.fail(&*err, 402),
    };

    sleep(Duration::from_millis(200)).await;
    Ok(())
}

use serde_json::json;
use tokio::time::{sleep, Duration};

use evlog::clickhouse::{ClickHouseConfig, ClickHouseDrain};
use evlog::{Logger, LoggerConfig, RequestMeta};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClickHouseConfig {
        url: "http://127.0.0.1:8123".to_string(),
        database: "default".to_string(),
        table: "wide_events".to_string(),
        user: Some("default".to_string()),
        ..ClickHouseConfig::default()
    };
    let drain = ClickHouseDrain::new(config);
    if let Err(e) = drain.validate_schema().await {
        eprintln!("clickhouse table check failed: {}", e);
    }

    let logger = Logger::builder(LoggerConfig::from_env()).drain(drain).build()?;

    let log = logger.request(RequestMeta::new("GET", "/api/test/success"), [("x-request-id", "r1")]);
    log.set(json!({"user": {"id": "user_123", "plan": "premium"}, "action": "test_success"}));
    log.set(json!({"processingStep": "complete"}));
    log.finish(200);

    sleep(Duration::from_secs(2)).await;
    Ok(())
}

use serde_json::json;

use evlog::format::ConsoleStream;
use evlog::writer::MemoryWriter;
use evlog::{EnvironmentContext, EvlogError, Logger, LoggerConfig, RequestMeta};

fn pretty_logger() -> (Logger, MemoryWriter) {
    let writer = MemoryWriter::new();
    let mut config = LoggerConfig::new(EnvironmentContext::new("shop", "development"));
    config.pretty = true;
    config.colors = false;
    let logger = Logger::builder(config).writer(writer.clone()).build().unwrap();
    (logger, writer)
}

#[test]
fn request_event_renders_header_and_tree() {
    let (logger, writer) = pretty_logger();
    let log = logger.request(
        RequestMeta::new("GET", "/api/test/wide-event"),
        Vec::<(String, String)>::new(),
    );
    log.set(json!({"user": {"id": "user_789", "plan": "enterprise"}}));
    log.set(json!({"cart": {"items": 5, "currency": "USD"}}));
    log.finish(200);

    let (stream, text) = writer.lines().remove(0);
    assert_eq!(stream, ConsoleStream::Out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("INFO [shop] GET /api/test/wide-event 200 in "));
    assert_eq!(lines[1], "  ├─ user: id=user_789 plan=enterprise");
    assert_eq!(lines[2], "  └─ cart: items=5 currency=USD");
}

#[test]
fn failed_request_goes_to_error_stream() {
    let (logger, writer) = pretty_logger();
    let log = logger.request(RequestMeta::new("POST", "/api/pay"), Vec::<(String, String)>::new());
    log.fail(&EvlogError::new("Payment processing failed"), 400);

    let (stream, text) = writer.lines().remove(0);
    assert_eq!(stream, ConsoleStream::Error);
    assert!(text.lines().next().unwrap().contains("ERROR [shop] POST /api/pay 400"));
    assert!(text.ends_with("└─ error: name=EvlogError message=Payment processing failed"));
}

#[test]
fn fields_missing_from_header_stay_in_tree() {
    let (logger, writer) = pretty_logger();
    let log = logger.detached();
    log.set(json!({"method": "nightly-sync", "status": "partial", "rows": 3}));
    log.emit();

    let (_, text) = writer.lines().remove(0);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].contains("INFO [shop] in "));
    assert!(!lines[0].contains("nightly-sync"));
    assert_eq!(lines[1], "  ├─ method: nightly-sync");
    assert_eq!(lines[2], "  ├─ status: partial");
    assert_eq!(lines[3], "  └─ rows: 3");
}

#[test]
fn numeric_duration_is_not_dropped() {
    let (logger, writer) = pretty_logger();
    let log = logger.request(RequestMeta::new("GET", "/health"), Vec::<(String, String)>::new());
    log.set(json!({"duration": 12}));
    log.finish(200);

    let (_, text) = writer.lines().remove(0);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].ends_with("GET /health 200"));
    assert_eq!(lines[1], "  └─ duration: 12");
}

use std::io;

use serde_json::{json, Value};

use evlog::error::ParsedError;
use evlog::{define_error, ErrorOptions, EvlogError};

#[test]
fn record_matches_transport_shape() {
    let err = EvlogError::from(
        ErrorOptions::new("Payment failed")
            .why("Card declined")
            .fix("Retry")
            .cause(io::Error::new(io::ErrorKind::Other, "network")),
    );
    let mut value = serde_json::to_value(err.to_record()).unwrap();
    let stack = value.as_object_mut().unwrap().remove("stack").unwrap();
    assert!(stack.is_string());
    assert_eq!(
        value,
        json!({
            "name": "EvlogError",
            "message": "Payment failed",
            "why": "Card declined",
            "fix": "Retry",
            "cause": {"name": "Error", "message": "network"},
        })
    );
}

#[test]
fn propagates_with_question_mark() {
    fn charge() -> Result<(), EvlogError> {
        Err(define_error(
            ErrorOptions::new("Payment failed").link("https://docs.example.com/errors/payment"),
        ))
    }

    fn checkout() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        charge()?;
        Ok(())
    }

    let err = checkout().unwrap_err();
    let evlog = err.downcast_ref::<EvlogError>().unwrap();
    assert_eq!(evlog.link(), Some("https://docs.example.com/errors/payment"));
    assert_eq!(
        evlog.render_with(false),
        "Error: Payment failed\nMore info: https://docs.example.com/errors/payment"
    );
}

#[test]
fn response_body_is_understood_by_the_client_parser() {
    let err = define_error(ErrorOptions::new("Quota exceeded").why("Free plan limit").fix("Upgrade"));
    let body: Value = serde_json::from_str(&err.to_response_body(429).to_string()).unwrap();
    assert_eq!(
        ParsedError::from_response_body(&body),
        ParsedError {
            message: "Quota exceeded".into(),
            status: 429,
            why: Some("Free plan limit".into()),
            fix: Some("Upgrade".into()),
            link: None,
        }
    );
}

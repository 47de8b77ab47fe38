//! Wide-event logging for request pipelines.
//!
//! Instead of many log lines per request, a [`RequestLogger`] accumulates
//! every piece of context observed while handling the request and emits
//! exactly one structured [`WideEvent`] when the request finishes. The
//! finished event is rendered to the console (pretty or JSON) and handed,
//! off the request path, to any registered [`DrainHook`]s together with
//! the request descriptor and its non-sensitive headers.
//!
//! ```no_run
//! use evlog::{Logger, LoggerConfig, RequestMeta};
//! use serde_json::json;
//!
//! let logger = Logger::new(LoggerConfig::from_env());
//! let log = logger.request(RequestMeta::new("POST", "/api/checkout"), [("x-request-id", "r1")]);
//! log.set(json!({"user": {"id": "u1"}}));
//! log.set(json!({"user": {"plan": "premium"}, "cart": {"items": 3}}));
//! log.finish(200);
//! ```

pub mod record;
pub mod merge;
pub mod format;
pub mod error;
pub mod headers;
pub mod drain;
pub mod dispatcher;
pub mod noop_drain;

#[cfg(feature = "clickhouse")]
pub mod clickhouse;

pub mod writer;
pub mod logger;
pub mod scope;
pub mod client;
pub mod layer;
pub mod env;
pub mod init;

/// Target of this crate's own `tracing` diagnostics.
pub(crate) const DIAGNOSTICS: &str = "evlog::diagnostics";

pub use client::{ClientConfig, ClientLogger};
pub use dispatcher::{DrainDispatcher, DrainStats};
pub use drain::{DrainContext, DrainHook};
pub use env::EnvironmentContext;
pub use error::{define_error, ErrorOptions, EvlogError};
pub use format::OutputMode;
pub use init::{Logger, LoggerConfig};
pub use logger::RequestLogger;
pub use record::{Level, RequestMeta, WideEvent};

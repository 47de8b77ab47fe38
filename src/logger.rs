//! Request-scoped wide-event accumulator.
//!
//! A [`RequestLogger`] is created once per request, collects context via
//! [`set`](RequestLogger::set) and [`error`](RequestLogger::error) while the
//! request is handled, and publishes exactly one [`WideEvent`] on
//! [`emit`](RequestLogger::emit).

use crate::env::EnvironmentContext;
use crate::error::{error_name, EvlogError};
use crate::format::format_duration;
use crate::init::{Logger, LoggerConfig, Shared};
use crate::merge::{deep_merge, to_object};
use crate::record::{CauseRecord, ErrorInfo, Level, RequestMeta, WideEvent};
use crate::DIAGNOSTICS;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

struct State {
    fields: Map<String, Value>,
    level: Level,
    error: Option<ErrorInfo>,
    emitted: Option<WideEvent>,
}

struct Inner {
    shared: Arc<Shared>,
    started: Instant,
    request: Option<RequestMeta>,
    headers: Vec<(String, String)>,
    state: Mutex<State>,
}

/// Accumulates everything known about one request into a single event.
///
/// Clones share the same accumulator, so a clone can be handed to helpers
/// or stored in a task-local scope. State is behind a mutex, which makes
/// the logger safe to use from a multi-threaded runtime; calls are still
/// expected to come from the request's own handling code.
///
/// Once emitted the logger is spent: later `set`/`error` calls are ignored
/// (with a debug diagnostic) and later `emit` calls return the first event.
#[derive(Clone)]
pub struct RequestLogger {
    inner: Arc<Inner>,
}

impl RequestLogger {
    /// Standalone accumulator writing to the console, without drain hooks.
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        let env = EnvironmentContext::new(service, environment);
        Logger::new(LoggerConfig::new(env)).detached()
    }

    pub(crate) fn bind(
        shared: Arc<Shared>,
        request: Option<RequestMeta>,
        headers: Vec<(String, String)>,
    ) -> Self {
        let mut fields = Map::new();
        if let Some(meta) = &request {
            fields.insert("method".into(), Value::String(meta.method.clone()));
            fields.insert("path".into(), Value::String(meta.path.clone()));
            if let Some(id) = &meta.request_id {
                fields.insert("requestId".into(), Value::String(id.clone()));
            }
        }
        Self {
            inner: Arc::new(Inner {
                shared,
                started: Instant::now(),
                request,
                headers,
                state: Mutex::new(State {
                    fields,
                    level: Level::Info,
                    error: None,
                    emitted: None,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Deep-merge `partial` into the accumulated fields.
    ///
    /// `partial` must serialize to a JSON object; anything else (a number,
    /// a string, an array, or a value whose `Serialize` impl fails) is
    /// ignored with a debug diagnostic.
    pub fn set<T: Serialize>(&self, partial: T) {
        let Some(partial) = to_object(partial) else {
            tracing::debug!(
                target: DIAGNOSTICS,
                "set() ignored: value does not serialize to a JSON object"
            );
            return;
        };
        let spent = {
            let mut state = self.state();
            if state.emitted.is_none() {
                deep_merge(&mut state.fields, partial);
            }
            state.emitted.is_some()
        };
        if spent {
            tracing::debug!(target: DIAGNOSTICS, "set() ignored: wide event already emitted");
        }
    }

    /// Record a failure and escalate the event to `error`.
    ///
    /// Extracts the message and, for an [`EvlogError`], its stack and
    /// `why`/`fix`/`link`. The error's `source()` is summarized as the cause.
    ///
    /// Last call wins: a second call replaces the error recorded by the
    /// first rather than chaining onto it.
    pub fn error(&self, err: &(dyn Error + 'static)) {
        self.record_error(err, None);
    }

    /// [`error`](Self::error), then merge `extra` exactly like [`set`](Self::set).
    pub fn error_with<T: Serialize>(&self, err: &(dyn Error + 'static), extra: T) {
        let extra = to_object(extra);
        if extra.is_none() {
            tracing::debug!(
                target: DIAGNOSTICS,
                "error_with() extra ignored: value does not serialize to a JSON object"
            );
        }
        self.record_error(err, extra);
    }

    fn record_error(&self, err: &(dyn Error + 'static), extra: Option<Map<String, Value>>) {
        let info = error_info(err);
        let spent = {
            let mut state = self.state();
            if state.emitted.is_none() {
                state.level = Level::Error;
                state.error = Some(info);
                if let Some(extra) = extra {
                    deep_merge(&mut state.fields, extra);
                }
            }
            state.emitted.is_some()
        };
        if spent {
            tracing::debug!(target: DIAGNOSTICS, "error() ignored: wide event already emitted");
        }
    }

    /// Snapshot of the fields accumulated so far.
    pub fn context(&self) -> Map<String, Value> {
        let state = self.state();
        match &state.emitted {
            Some(event) => event.fields.clone(),
            None => state.fields.clone(),
        }
    }

    pub fn is_emitted(&self) -> bool {
        self.state().emitted.is_some()
    }

    pub fn request(&self) -> Option<&RequestMeta> {
        self.inner.request.as_ref()
    }

    /// Finalize and publish the event.
    ///
    /// The first call stamps the timestamp, adds `duration` (unless already
    /// set), renders to the console sink and queues the drain context
    /// without waiting for it. Every later call returns that same event
    /// and does nothing else.
    pub fn emit(&self) -> WideEvent {
        self.finalize(None)
    }

    /// Merge `overrides` into the fields, then [`emit`](Self::emit). On a
    /// spent logger the overrides are discarded.
    pub fn emit_with<T: Serialize>(&self, overrides: T) -> WideEvent {
        self.finalize(to_object(overrides))
    }

    /// Response hook: record `status` and emit.
    pub fn finish(&self, status: u16) -> WideEvent {
        self.finalize(Some(status_field(status)))
    }

    /// Error hook: record `err` and `status`, then emit.
    pub fn fail(&self, err: &(dyn Error + 'static), status: u16) -> WideEvent {
        self.error(err);
        self.finalize(Some(status_field(status)))
    }

    fn finalize(&self, overrides: Option<Map<String, Value>>) -> WideEvent {
        let event = {
            let mut state = self.state();
            if let Some(event) = &state.emitted {
                let event = event.clone();
                drop(state);
                tracing::debug!(
                    target: DIAGNOSTICS,
                    "emit() on spent logger returns the first event"
                );
                return event;
            }
            if let Some(overrides) = overrides {
                deep_merge(&mut state.fields, overrides);
            }
            let mut fields = std::mem::take(&mut state.fields);
            if !fields.contains_key("duration") {
                fields.insert(
                    "duration".into(),
                    Value::String(format_duration(self.inner.started.elapsed())),
                );
            }
            let env = &self.inner.shared.config.env;
            let event = WideEvent {
                timestamp: Utc::now(),
                level: state.level,
                service: env.service.clone(),
                environment: env.environment.clone(),
                version: env.version.clone(),
                commit_hash: env.commit_hash.clone(),
                region: env.region.clone(),
                fields,
                error: state.error.clone(),
            };
            state.emitted = Some(event.clone());
            event
        };

        self.inner
            .shared
            .publish(&event, self.inner.request.clone(), &self.inner.headers);
        event
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("request", &self.inner.request)
            .field("emitted", &self.is_emitted())
            .finish()
    }
}

fn status_field(status: u16) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("status".into(), Value::from(status));
    map
}

fn error_info(err: &(dyn Error + 'static)) -> ErrorInfo {
    let cause = err.source().map(|source| CauseRecord {
        name: error_name(source).to_string(),
        message: source.to_string(),
    });
    match err.downcast_ref::<EvlogError>() {
        Some(evlog) => ErrorInfo {
            name: error_name(err).to_string(),
            message: evlog.message().to_string(),
            stack: Some(evlog.stack().to_string()),
            why: evlog.why().map(str::to_string),
            fix: evlog.fix().map(str::to_string),
            link: evlog.link().map(str::to_string),
            cause,
        },
        None => ErrorInfo {
            name: error_name(err).to_string(),
            message: err.to_string(),
            stack: None,
            why: None,
            fix: None,
            link: None,
            cause,
        },
    }
}

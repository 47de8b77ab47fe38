use crate::error::EvlogError;
use crate::merge::{deep_merge, nest_dotted};
use crate::scope::use_logger;
use crate::DIAGNOSTICS;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that folds `tracing` events emitted inside a
/// request [`scope`](crate::scope::scope) into that request's wide event.
///
/// Fields are deep-merged, with dotted names (`user.id`) expanded into
/// nested objects. An `ERROR` event's message is additionally recorded as
/// the request's error. Events outside a scope, below `min_level`, or from
/// this crate's own diagnostics are ignored.
pub struct WideEventLayer {
    min_level: Level,
}

impl WideEventLayer {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl Default for WideEventLayer {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl<S> Layer<S> for WideEventLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // tracing orders levels by verbosity: ERROR is the smallest.
        if *meta.level() > self.min_level || meta.target() == DIAGNOSTICS {
            return;
        }
        let Ok(logger) = use_logger() else {
            return;
        };

        let mut fields = Map::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        if *meta.level() == Level::ERROR {
            let err = EvlogError::new(message.unwrap_or_else(|| meta.name().to_string()));
            logger.error_with(&err, fields);
        } else if !fields.is_empty() {
            logger.set(fields);
        }
    }
}

/// Collects event fields into a JSON object, expanding dotted names.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
}

impl FieldVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        deep_merge(self.fields, nest_dotted(field.name(), value));
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::String(format!("{:?}", value)));
        }
    }
}

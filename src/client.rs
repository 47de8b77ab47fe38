//! Immediate, non-accumulating logging for code that runs outside a
//! request lifecycle.

use crate::format::{format_json, format_structured_pretty, format_tagged_pretty, ConsoleStream};
use crate::init::LoggerConfig;
use crate::merge::to_object;
use crate::record::Level;
use crate::writer::{ConsoleWriter, EventWriter};
use crate::DIAGNOSTICS;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Service name used by [`ClientConfig::default`].
pub const DEFAULT_CLIENT_SERVICE: &str = "client";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub service: String,
    pub pretty: bool,
    pub colors: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_CLIENT_SERVICE.to_string(),
            pretty: true,
            colors: false,
        }
    }
}

impl From<&LoggerConfig> for ClientConfig {
    fn from(config: &LoggerConfig) -> Self {
        Self {
            service: config.env.service.clone(),
            pretty: config.pretty,
            colors: config.colors,
        }
    }
}

/// Writes every call immediately; no buffering, no drain.
///
/// Two call shapes per level: `*_tagged(tag, message)` for a short tagged
/// line, and `info(fields)`-style calls for a one-shot structured event.
#[derive(Clone)]
pub struct ClientLogger {
    config: ClientConfig,
    writer: Arc<dyn EventWriter>,
}

impl ClientLogger {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_writer(config, Arc::new(ConsoleWriter))
    }

    pub fn with_writer(config: ClientConfig, writer: Arc<dyn EventWriter>) -> Self {
        Self { config, writer }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `[tag] message` in pretty mode; in JSON mode the structured event
    /// `{tag, message}`.
    pub fn log_tagged(&self, level: Level, tag: &str, message: &str) {
        if self.config.pretty {
            let line = format_tagged_pretty(level, tag, message, self.config.colors);
            self.writer.write_line(ConsoleStream::for_level(level), &line);
        } else {
            let mut fields = Map::new();
            fields.insert("tag".into(), Value::String(tag.to_string()));
            fields.insert("message".into(), Value::String(message.to_string()));
            self.write_structured(level, fields);
        }
    }

    /// One-shot event: `timestamp`, `level`, `service`, then the given
    /// fields at the top level. Non-object input is ignored.
    pub fn log_structured<T: Serialize>(&self, level: Level, fields: T) {
        match to_object(fields) {
            Some(fields) => self.write_structured(level, fields),
            None => tracing::debug!(
                target: DIAGNOSTICS,
                "structured log ignored: value is not a JSON object"
            ),
        }
    }

    fn write_structured(&self, level: Level, fields: Map<String, Value>) {
        let stream = ConsoleStream::for_level(level);
        let line = if self.config.pretty {
            format_structured_pretty(level, &self.config.service, &fields, self.config.colors)
        } else {
            let mut map = Map::new();
            map.insert(
                "timestamp".into(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
            map.insert("level".into(), Value::String(level.as_str().into()));
            map.insert("service".into(), Value::String(self.config.service.clone()));
            map.extend(fields);
            format_json(map)
        };
        self.writer.write_line(stream, &line);
    }

    pub fn debug<T: Serialize>(&self, fields: T) {
        self.log_structured(Level::Debug, fields);
    }

    pub fn info<T: Serialize>(&self, fields: T) {
        self.log_structured(Level::Info, fields);
    }

    pub fn warn<T: Serialize>(&self, fields: T) {
        self.log_structured(Level::Warn, fields);
    }

    pub fn error<T: Serialize>(&self, fields: T) {
        self.log_structured(Level::Error, fields);
    }

    pub fn debug_tagged(&self, tag: &str, message: &str) {
        self.log_tagged(Level::Debug, tag, message);
    }

    pub fn info_tagged(&self, tag: &str, message: &str) {
        self.log_tagged(Level::Info, tag, message);
    }

    pub fn warn_tagged(&self, tag: &str, message: &str) {
        self.log_tagged(Level::Warn, tag, message);
    }

    pub fn error_tagged(&self, tag: &str, message: &str) {
        self.log_tagged(Level::Error, tag, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::MemoryWriter;
    use serde_json::json;

    fn client(pretty: bool) -> (ClientLogger, MemoryWriter) {
        let writer = MemoryWriter::new();
        let config = ClientConfig {
            service: "web".into(),
            pretty,
            colors: false,
        };
        (ClientLogger::with_writer(config, Arc::new(writer.clone())), writer)
    }

    #[test]
    fn tagged_pretty() {
        let (log, writer) = client(true);
        log.info_tagged("auth", "User logged in");
        log.warn_tagged("cache", "miss");
        assert_eq!(
            writer.lines(),
            vec![
                (ConsoleStream::Out, "[auth] User logged in".to_string()),
                (ConsoleStream::Warn, "[cache] miss".to_string()),
            ]
        );
    }

    #[test]
    fn tagged_json_is_structured() {
        let (log, writer) = client(false);
        log.error_tagged("db", "connection lost");
        let (stream, line) = writer.lines().remove(0);
        assert_eq!(stream, ConsoleStream::Error);
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["service"], "web");
        assert_eq!(value["tag"], "db");
        assert_eq!(value["message"], "connection lost");
    }

    #[test]
    fn structured_json_is_flat_and_immediate() {
        let (log, writer) = client(false);
        log.info(json!({"action": "checkout", "items": 3}));
        assert_eq!(writer.len(), 1);
        let value: Value = serde_json::from_str(&writer.lines()[0].1).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["timestamp", "level", "service", "action", "items"]);
        assert_eq!(value["items"], 3);
    }

    #[test]
    fn structured_pretty_lists_fields() {
        let (log, writer) = client(true);
        log.debug(json!({"action": "checkout"}));
        assert_eq!(writer.lines()[0].1, "[web] debug\n  └─ action: checkout");
    }

    #[test]
    fn non_object_is_ignored() {
        let (log, writer) = client(false);
        log.info("just a string");
        assert!(writer.is_empty());
    }
}

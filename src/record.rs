use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Severity of a wide event or of an immediate log line.
///
/// Ordered so that escalation can be expressed as `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{name, message}` summary of an originating error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CauseRecord {
    pub name: String,
    pub message: String,
}

/// Failure details captured by [`RequestLogger::error`](crate::logger::RequestLogger::error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<CauseRecord>,
}

/// Minimal description of the request a wide event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// The single record emitted for one request.
///
/// Serializes flat: `timestamp`, `level`, `service`, `environment`, the
/// optional deployment keys, then every merged field as a sibling key and
/// finally `error` when a failure was recorded. A field named like one of
/// the reserved keys overwrites it.
#[derive(Debug, Clone, PartialEq)]
pub struct WideEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub service: String,
    pub environment: String,
    pub version: Option<String>,
    pub commit_hash: Option<String>,
    pub region: Option<String>,
    pub fields: Map<String, Value>,
    pub error: Option<ErrorInfo>,
}

impl WideEvent {
    /// ISO-8601 timestamp with millisecond precision, e.g. `2026-01-01T12:00:00.000Z`.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Flat JSON object as written in JSON mode and handed to drains.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("timestamp".into(), Value::String(self.timestamp_iso()));
        map.insert("level".into(), Value::String(self.level.as_str().into()));
        map.insert("service".into(), Value::String(self.service.clone()));
        map.insert("environment".into(), Value::String(self.environment.clone()));
        if let Some(version) = &self.version {
            map.insert("version".into(), Value::String(version.clone()));
        }
        if let Some(commit) = &self.commit_hash {
            map.insert("commitHash".into(), Value::String(commit.clone()));
        }
        if let Some(region) = &self.region {
            map.insert("region".into(), Value::String(region.clone()));
        }
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        if let Some(error) = &self.error {
            if let Ok(value) = serde_json::to_value(error) {
                map.insert("error".into(), value);
            }
        }
        map
    }
}

impl Serialize for WideEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}

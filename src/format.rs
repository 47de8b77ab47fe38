//! Rendering of wide events and immediate log lines.
//!
//! Two modes, picked once per [`Logger`](crate::init::Logger) or
//! [`ClientLogger`](crate::client::ClientLogger):
//!
//! - [`OutputMode::Pretty`]: a header line followed by one tree line per
//!   field, for interactive terminals.
//! - [`OutputMode::Json`]: one line of compact JSON with every field at
//!   the top level, for ingestion pipelines.

use crate::record::{Level, WideEvent};
use serde_json::{Map, Value};
use std::time::Duration;

/// How events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Pretty,
    Json,
}

/// Console stream an event is written to. Fixed per level by
/// [`ConsoleStream::for_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Out,
    Warn,
    Error,
}

impl ConsoleStream {
    pub const fn for_level(level: Level) -> Self {
        match level {
            Level::Error => ConsoleStream::Error,
            Level::Warn => ConsoleStream::Warn,
            Level::Info | Level::Debug => ConsoleStream::Out,
        }
    }
}

/// ANSI escape sequences, or empty strings when colors are off.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub reset: &'static str,
    pub bold: &'static str,
    pub dim: &'static str,
    pub red: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub cyan: &'static str,
    pub gray: &'static str,
}

impl Palette {
    const ANSI: Palette = Palette {
        reset: "\x1b[0m",
        bold: "\x1b[1m",
        dim: "\x1b[2m",
        red: "\x1b[31m",
        green: "\x1b[32m",
        yellow: "\x1b[33m",
        cyan: "\x1b[36m",
        gray: "\x1b[90m",
    };

    const PLAIN: Palette = Palette {
        reset: "",
        bold: "",
        dim: "",
        red: "",
        green: "",
        yellow: "",
        cyan: "",
        gray: "",
    };

    pub const fn new(colors: bool) -> Self {
        if colors {
            Self::ANSI
        } else {
            Self::PLAIN
        }
    }

    pub const fn level(&self, level: Level) -> &'static str {
        match level {
            Level::Error => self.red,
            Level::Warn => self.yellow,
            Level::Info => self.cyan,
            Level::Debug => self.gray,
        }
    }
}

/// Render a finished wide event.
pub fn format_event(event: &WideEvent, mode: OutputMode, colors: bool) -> String {
    match mode {
        OutputMode::Json => format_json(event.to_json_map()),
        OutputMode::Pretty => format_pretty_event(event, colors),
    }
}

/// Compact single-line JSON.
pub fn format_json(map: Map<String, Value>) -> String {
    Value::Object(map).to_string()
}

fn format_pretty_event(event: &WideEvent, colors: bool) -> String {
    let p = Palette::new(colors);
    let level_color = p.level(event.level);
    let mut header = format!(
        "{}{}{} {}{}{}{} {}[{}]{}",
        p.dim,
        event.timestamp.format("%H:%M:%S%.3f"),
        p.reset,
        level_color,
        p.bold,
        event.level.as_str().to_uppercase(),
        p.reset,
        p.cyan,
        event.service,
        p.reset,
    );

    // Keys printed in the header; everything else goes to the tree.
    let mut in_header: Vec<&str> = Vec::new();
    let text = |key: &str| event.fields.get(key).and_then(Value::as_str);
    if let (Some(method), Some(path)) = (text("method"), text("path")) {
        header.push_str(&format!(" {} {}", method, path));
        in_header.extend(["method", "path"]);
    }
    if let Some(status) = event.fields.get("status").and_then(Value::as_u64) {
        let color = if status >= 400 { p.red } else { p.green };
        header.push_str(&format!(" {}{}{}", color, status, p.reset));
        in_header.push("status");
    }
    if let Some(duration) = text("duration") {
        header.push_str(&format!(" {}in {}{}", p.dim, duration, p.reset));
        in_header.push("duration");
    }

    let mut entries: Vec<(&str, Value)> = event
        .fields
        .iter()
        .filter(|(key, _)| !in_header.contains(&key.as_str()))
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect();
    if let Some(error) = &event.error {
        if let Ok(value) = serde_json::to_value(error) {
            entries.push(("error", without_stack(value)));
        }
    }

    let mut lines = vec![header];
    lines.extend(tree_lines(&entries, &p));
    lines.join("\n")
}

/// `[tag] message`, colored by level.
pub fn format_tagged_pretty(level: Level, tag: &str, message: &str, colors: bool) -> String {
    let p = Palette::new(colors);
    format!("{}{}[{}]{} {}", p.level(level), p.bold, tag, p.reset, message)
}

/// `[service] level` header followed by the event's own fields as a tree.
pub fn format_structured_pretty(
    level: Level,
    service: &str,
    fields: &Map<String, Value>,
    colors: bool,
) -> String {
    let p = Palette::new(colors);
    let mut lines = vec![format!(
        "{}{}[{}]{} {}",
        p.level(level),
        p.bold,
        service,
        p.reset,
        level.as_str()
    )];
    let entries: Vec<(&str, Value)> = fields
        .iter()
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect();
    lines.extend(tree_lines(&entries, &p));
    lines.join("\n")
}

fn tree_lines(entries: &[(&str, Value)], p: &Palette) -> Vec<String> {
    let last = entries.len().saturating_sub(1);
    entries
        .iter()
        .enumerate()
        .map(|(i, (key, value))| {
            let branch = if i == last { "└─" } else { "├─" };
            format!(
                "  {}{}{} {}{}:{} {}",
                p.dim,
                branch,
                p.reset,
                p.cyan,
                key,
                p.reset,
                inline_value(value)
            )
        })
        .collect()
}

/// Objects render as space separated `k=v` pairs, one level deep; deeper
/// values and arrays fall back to compact JSON. Strings are unquoted.
fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

fn without_stack(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove("stack");
    }
    value
}

/// `"<n>ms"` below one second, `"<n.nn>s"` from one second on.
pub fn format_duration(elapsed: Duration) -> String {
    let ms = elapsed.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{}ms", ms.round() as u64)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

use crate::format::Palette;
use crate::record::CauseRecord;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::io::IsTerminal;
use std::sync::Arc;

/// Value of `name` in serialized [`EvlogError`]s.
pub const EVLOG_ERROR_NAME: &str = "EvlogError";

/// Name reported for causes that are not themselves [`EvlogError`]s.
const GENERIC_ERROR_NAME: &str = "Error";

type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// Construction options for [`EvlogError`].
///
/// ```
/// use evlog::error::{ErrorOptions, EvlogError};
///
/// let err = EvlogError::from(
///     ErrorOptions::new("Failed to sync repository")
///         .why("GitHub API rate limit exceeded")
///         .fix("Wait 1 hour or use a different token")
///         .link("https://docs.github.com/en/rest/rate-limit"),
/// );
/// assert_eq!(err.why(), Some("GitHub API rate limit exceeded"));
/// ```
#[derive(Clone, Default)]
pub struct ErrorOptions {
    pub message: String,
    pub why: Option<String>,
    pub fix: Option<String>,
    pub link: Option<String>,
    pub cause: Option<Cause>,
}

impl ErrorOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn why(mut self, why: impl Into<String>) -> Self {
        self.why = Some(why.into());
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn cause<E>(mut self, cause: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Attach an already shared cause without taking ownership of it.
    pub fn shared_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Debug for ErrorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorOptions")
            .field("message", &self.message)
            .field("why", &self.why)
            .field("fix", &self.fix)
            .field("link", &self.link)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl From<&str> for ErrorOptions {
    fn from(message: &str) -> Self {
        ErrorOptions::new(message)
    }
}

impl From<String> for ErrorOptions {
    fn from(message: String) -> Self {
        ErrorOptions::new(message)
    }
}

/// Error carrying diagnostic context beyond its message: why it happened,
/// how to fix it, where to read more, and what caused it.
///
/// Immutable once built. Usable both as an `Err` value that propagates with
/// `?` and as plain data handed to [`RequestLogger::error`](crate::logger::RequestLogger::error).
#[derive(Clone)]
pub struct EvlogError {
    message: String,
    why: Option<String>,
    fix: Option<String>,
    link: Option<String>,
    cause: Option<Cause>,
    stack: String,
}

impl EvlogError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::from(ErrorOptions::new(message))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn why(&self) -> Option<&str> {
        self.why.as_deref()
    }

    pub fn fix(&self) -> Option<&str> {
        self.fix.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// `EvlogError: <message>` followed by the captured backtrace, when
    /// backtraces are enabled for the process.
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Multi-line rendering, colorized when stderr is a terminal.
    pub fn render(&self) -> String {
        self.render_with(std::io::stderr().is_terminal())
    }

    /// Multi-line rendering:
    ///
    /// ```text
    /// Error: <message>
    /// Why: <why>
    /// Fix: <fix>
    /// More info: <link>
    /// Caused by: <cause message>
    /// ```
    ///
    /// Lines after the first appear only when the field is set.
    pub fn render_with(&self, colors: bool) -> String {
        let p = Palette::new(colors);
        let mut lines = vec![format!("{}{}Error:{} {}", p.red, p.bold, p.reset, self.message)];
        if let Some(why) = &self.why {
            lines.push(format!("{}Why:{} {}", p.yellow, p.reset, why));
        }
        if let Some(fix) = &self.fix {
            lines.push(format!("{}Fix:{} {}", p.cyan, p.reset, fix));
        }
        if let Some(link) = &self.link {
            lines.push(format!("{}More info:{} {}", p.dim, p.reset, link));
        }
        if let Some(cause) = &self.cause {
            lines.push(format!("{}Caused by:{} {}", p.dim, p.reset, cause));
        }
        lines.join("\n")
    }

    /// Plain record for JSON transport. The cause is summarized to its
    /// name and message only.
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            name: EVLOG_ERROR_NAME.to_string(),
            message: self.message.clone(),
            why: self.why.clone(),
            fix: self.fix.clone(),
            link: self.link.clone(),
            cause: self.cause.as_deref().map(summarize_cause),
            stack: self.stack.clone(),
        }
    }

    /// HTTP error body the host can return for this error:
    /// `{statusCode, message, data: {why, fix, link}}`.
    pub fn to_response_body(&self, status: u16) -> Value {
        let mut data = Map::new();
        if let Some(why) = &self.why {
            data.insert("why".into(), Value::String(why.clone()));
        }
        if let Some(fix) = &self.fix {
            data.insert("fix".into(), Value::String(fix.clone()));
        }
        if let Some(link) = &self.link {
            data.insert("link".into(), Value::String(link.clone()));
        }
        json!({
            "statusCode": status,
            "message": self.message,
            "data": data,
        })
    }
}

/// Functional alternative to `EvlogError::from(options)`.
pub fn define_error(options: impl Into<ErrorOptions>) -> EvlogError {
    EvlogError::from(options.into())
}

impl From<ErrorOptions> for EvlogError {
    fn from(opts: ErrorOptions) -> Self {
        let backtrace = Backtrace::capture();
        let stack = match backtrace.status() {
            BacktraceStatus::Captured => {
                format!("{}: {}\n{}", EVLOG_ERROR_NAME, opts.message, backtrace)
            }
            _ => format!("{}: {}", EVLOG_ERROR_NAME, opts.message),
        };
        EvlogError {
            message: opts.message,
            why: opts.why,
            fix: opts.fix,
            link: opts.link,
            cause: opts.cause,
            stack,
        }
    }
}

impl From<&str> for EvlogError {
    fn from(message: &str) -> Self {
        EvlogError::new(message)
    }
}

impl From<String> for EvlogError {
    fn from(message: String) -> Self {
        EvlogError::new(message)
    }
}

impl fmt::Display for EvlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for EvlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvlogError")
            .field("message", &self.message)
            .field("why", &self.why)
            .field("fix", &self.fix)
            .field("link", &self.link)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl Error for EvlogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

impl Serialize for EvlogError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Serialized form of an [`EvlogError`]. Absent optional fields are
/// omitted from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<CauseRecord>,
    pub stack: String,
}

pub(crate) fn error_name(err: &(dyn Error + 'static)) -> &'static str {
    if err.is::<EvlogError>() {
        EVLOG_ERROR_NAME
    } else {
        GENERIC_ERROR_NAME
    }
}

pub(crate) fn summarize_cause(cause: &(dyn Error + Send + Sync + 'static)) -> CauseRecord {
    CauseRecord {
        name: error_name(cause).to_string(),
        message: cause.to_string(),
    }
}

/// Client-side view of an error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedError {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ParsedError {
    const FALLBACK_MESSAGE: &'static str = "An error occurred";
    const FALLBACK_STATUS: u16 = 500;

    /// Recover `{message, status, why, fix, link}` from a body shaped like
    /// [`EvlogError::to_response_body`]. Missing members fall back to
    /// `"An error occurred"` and status 500.
    pub fn from_response_body(body: &Value) -> Self {
        let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
        let data = body.get("data");
        ParsedError {
            message: text(body.get("message"))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| Self::FALLBACK_MESSAGE.to_string()),
            status: body
                .get("statusCode")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(Self::FALLBACK_STATUS),
            why: text(data.and_then(|d| d.get("why"))),
            fix: text(data.and_then(|d| d.get("fix"))),
            link: text(data.and_then(|d| d.get("link"))),
        }
    }

    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        match err.downcast_ref::<EvlogError>() {
            Some(evlog) => ParsedError {
                message: evlog.message.clone(),
                status: Self::FALLBACK_STATUS,
                why: evlog.why.clone(),
                fix: evlog.fix.clone(),
                link: evlog.link.clone(),
            },
            None => ParsedError {
                message: err.to_string(),
                status: Self::FALLBACK_STATUS,
                why: None,
                fix: None,
                link: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn payment_error() -> EvlogError {
        EvlogError::from(
            ErrorOptions::new("Payment failed")
                .why("Card declined")
                .fix("Retry")
                .cause(io::Error::new(io::ErrorKind::Other, "network")),
        )
    }

    #[test]
    fn record_summarizes_cause() {
        let record = payment_error().to_record();
        assert_eq!(record.name, "EvlogError");
        assert_eq!(record.message, "Payment failed");
        assert_eq!(record.why.as_deref(), Some("Card declined"));
        assert_eq!(record.fix.as_deref(), Some("Retry"));
        assert_eq!(record.link, None);
        assert_eq!(
            record.cause,
            Some(CauseRecord {
                name: "Error".into(),
                message: "network".into()
            })
        );
        assert!(record.stack.starts_with("EvlogError: Payment failed"));
    }

    #[test]
    fn record_json_omits_missing_fields() {
        let value = serde_json::to_value(payment_error()).unwrap();
        assert!(value.get("link").is_none());
        assert_eq!(value["cause"], json!({"name": "Error", "message": "network"}));
        assert!(value["stack"].is_string());
    }

    #[test]
    fn nested_evlog_cause_is_named() {
        let inner = EvlogError::new("db timeout");
        let outer = EvlogError::from(ErrorOptions::new("save failed").cause(inner));
        let cause = outer.to_record().cause.unwrap();
        assert_eq!(cause.name, "EvlogError");
        assert_eq!(cause.message, "db timeout");
        assert_eq!(outer.source().map(|s| s.to_string()).as_deref(), Some("db timeout"));
    }

    #[test]
    fn render_plain_lines_in_fixed_order() {
        let err = EvlogError::from(
            ErrorOptions::new("Payment failed")
                .link("https://docs.example.com/payments")
                .why("Card declined")
                .cause(io::Error::new(io::ErrorKind::Other, "network")),
        );
        assert_eq!(
            err.render_with(false),
            "Error: Payment failed\n\
             Why: Card declined\n\
             More info: https://docs.example.com/payments\n\
             Caused by: network"
        );
    }

    #[test]
    fn render_bare_message_is_single_line() {
        assert_eq!(EvlogError::new("boom").render_with(false), "Error: boom");
    }

    #[test]
    fn render_colored_wraps_labels() {
        let rendered = payment_error().render_with(true);
        assert!(rendered.contains("\x1b[31m\x1b[1mError:\x1b[0m Payment failed"));
        assert!(rendered.contains("\x1b[33mWhy:\x1b[0m Card declined"));
    }

    #[test]
    fn display_is_message_only() {
        assert_eq!(payment_error().to_string(), "Payment failed");
        let via_define = define_error("quick");
        assert_eq!(via_define.message(), "quick");
        assert_eq!(via_define.why(), None);
    }

    #[test]
    fn response_body_round_trips_through_parsed_error() {
        let body = payment_error().to_response_body(402);
        assert_eq!(
            body,
            json!({
                "statusCode": 402,
                "message": "Payment failed",
                "data": {"why": "Card declined", "fix": "Retry"},
            })
        );
        let parsed = ParsedError::from_response_body(&body);
        assert_eq!(parsed.status, 402);
        assert_eq!(parsed.why.as_deref(), Some("Card declined"));
        assert_eq!(parsed.link, None);
    }

    #[test]
    fn parsed_error_falls_back() {
        let parsed = ParsedError::from_response_body(&json!({}));
        assert_eq!(parsed.message, "An error occurred");
        assert_eq!(parsed.status, 500);

        let io_err = io::Error::new(io::ErrorKind::Other, "disk full");
        let parsed = ParsedError::from_error(&io_err);
        assert_eq!(parsed.message, "disk full");
        assert_eq!(parsed.why, None);
    }
}

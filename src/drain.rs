use crate::record::{RequestMeta, WideEvent};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;

/// Payload handed to every [`DrainHook`]: the finished event, the request
/// it belongs to and the request headers with sensitive entries removed.
///
/// `request` is `None` for loggers created with
/// [`Logger::detached`](crate::Logger::detached) or
/// [`RequestLogger::new`](crate::RequestLogger::new). The `request` key is
/// then absent from the serialized payload and `headers` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct DrainContext {
    pub event: WideEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestMeta>,
    pub headers: BTreeMap<String, String>,
}

/// Side-channel destination for finished wide events.
///
/// Implementations forward events to storage or analytics systems. The
/// dispatcher calls `drain` from a background task, once per emitted
/// event, and never awaits it on the request path.
#[async_trait]
pub trait DrainHook: Send + Sync {
    /// Forward one finished event.
    ///
    /// **Returns**
    /// - `Ok(())` if the destination accepted the event.
    /// - `Err(..)` on any failure. The error is logged at debug level and
    ///   otherwise dropped; it never reaches the request and does not stop
    ///   other hooks from running.
    ///
    /// No timeout is applied by the dispatcher. Hooks that talk to slow
    /// destinations should bound their own I/O.
    async fn drain(&self, ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use chrono::Utc;
    use serde_json::Map;

    #[test]
    fn detached_context_omits_request_key() {
        let ctx = DrainContext {
            event: WideEvent {
                timestamp: Utc::now(),
                level: Level::Info,
                service: "jobs".into(),
                environment: "test".into(),
                version: None,
                commit_hash: None,
                region: None,
                fields: Map::new(),
                error: None,
            },
            request: None,
            headers: BTreeMap::new(),
        };
        let value = serde_json::to_value(&ctx).unwrap();
        let map = value.as_object().unwrap();
        assert!(!map.contains_key("request"));
        assert_eq!(map["headers"], serde_json::json!({}));
    }
}

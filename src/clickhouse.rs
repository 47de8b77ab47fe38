use crate::drain::{DrainContext, DrainHook};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::error::Error;
use std::time::Duration;

/// Configuration for [`ClickHouseDrain`].
///
/// The drain talks to ClickHouse over HTTP using the `JSONEachRow` format,
/// one row per wide event. The full event is stored as a JSON string in the
/// `event` column next to a few indexed columns.
///
/// Expected table:
///
/// ```sql
/// CREATE TABLE wide_events (
///   timestamp   DateTime64(3),
///   level       LowCardinality(String),
///   service     LowCardinality(String),
///   environment LowCardinality(String),
///   method      Nullable(String),
///   path        Nullable(String),
///   request_id  Nullable(String),
///   event       String
/// ) ENGINE = MergeTree ORDER BY (service, timestamp);
/// ```
#[derive(Clone, Debug)]
pub struct ClickHouseConfig {
    /// Base URL without query, e.g. "http://127.0.0.1:8123"
    pub url: String,
    pub database: String,
    pub table: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Per-insert timeout.
    pub timeout: Duration,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8123".to_string(),
            database: "default".to_string(),
            table: "wide_events".to_string(),
            user: None,
            password: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// ClickHouse implementation of [`DrainHook`] using the HTTP interface.
#[derive(Clone)]
pub struct ClickHouseDrain {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseDrain {
    pub fn new(config: ClickHouseConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    fn credentials(&self) -> String {
        let mut query = String::new();
        if let Some(user) = &self.config.user {
            query.push_str(&format!("&user={}", urlencoding::encode(user)));
        }
        if let Some(password) = &self.config.password {
            query.push_str(&format!("&password={}", urlencoding::encode(password)));
        }
        query
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/?database={}&query={}{}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.database),
            urlencoding::encode(&format!("INSERT INTO {} FORMAT JSONEachRow", self.config.table)),
            self.credentials()
        )
    }

    fn map_context(ctx: &DrainContext) -> Result<ClickHouseRow, serde_json::Error> {
        let event = &ctx.event;
        Ok(ClickHouseRow {
            timestamp: event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level: event.level.as_str(),
            service: event.service.clone(),
            environment: event.environment.clone(),
            method: ctx.request.as_ref().map(|r| r.method.clone()),
            path: ctx.request.as_ref().map(|r| r.path.clone()),
            request_id: ctx.request.as_ref().and_then(|r| r.request_id.clone()),
            event: serde_json::to_string(event)?,
        })
    }

    /// Check that the target table exists. Optional; not called automatically.
    ///
    /// **Returns**
    /// - `Ok(())` if the `DESCRIBE TABLE` query succeeded.
    /// - `Err(..)` if ClickHouse responded with a non-success status.
    pub async fn validate_schema(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let url = format!(
            "{}/?query={}{}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&format!(
                "DESCRIBE TABLE {}.{} FORMAT JSON",
                self.config.database, self.config.table
            )),
            self.credentials()
        );
        let resp = self.client.get(&url).timeout(self.config.timeout).send().await?;
        if !resp.status().is_success() {
            return Err(format!(
                "ClickHouse schema validation failed with status {}",
                resp.status()
            )
            .into());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ClickHouseRow {
    timestamp: String,
    level: &'static str,
    service: String,
    environment: String,
    method: Option<String>,
    path: Option<String>,
    request_id: Option<String>,
    event: String,
}

#[async_trait]
impl DrainHook for ClickHouseDrain {
    async fn drain(&self, ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>> {
        let row = Self::map_context(ctx)?;
        let body = serde_json::to_string(&row)? + "\n";
        let resp = self
            .client
            .post(&self.endpoint())
            .timeout(self.config.timeout)
            .body(body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("ClickHouse insert failed with status {}: {}", status, text).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, RequestMeta, WideEvent};
    use chrono::{DateTime, Utc};
    use serde_json::{json, Map, Value};
    use std::collections::BTreeMap;

    fn ctx() -> DrainContext {
        DrainContext {
            event: WideEvent {
                timestamp: DateTime::parse_from_rfc3339("2026-03-01T10:20:30.456Z")
                    .unwrap()
                    .with_timezone(&Utc),
                level: Level::Warn,
                service: "api".into(),
                environment: "production".into(),
                version: None,
                commit_hash: None,
                region: None,
                fields: Map::new(),
                error: None,
            },
            request: Some(RequestMeta::new("GET", "/health").with_request_id("r-9")),
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn row_indexes_request_and_embeds_event() {
        let row = serde_json::to_value(ClickHouseDrain::map_context(&ctx()).unwrap()).unwrap();
        assert_eq!(row["timestamp"], "2026-03-01 10:20:30.456");
        assert_eq!(row["level"], "warn");
        assert_eq!(row["request_id"], "r-9");
        let event: Value = serde_json::from_str(row["event"].as_str().unwrap()).unwrap();
        assert_eq!(event["service"], json!("api"));
    }

    #[test]
    fn endpoint_encodes_query_and_credentials() {
        let drain = ClickHouseDrain::new(ClickHouseConfig {
            url: "http://ch:8123/".into(),
            user: Some("log writer".into()),
            ..ClickHouseConfig::default()
        });
        assert_eq!(
            drain.endpoint(),
            "http://ch:8123/?database=default&query=INSERT%20INTO%20wide_events%20FORMAT%20JSONEachRow&user=log%20writer"
        );
    }
}

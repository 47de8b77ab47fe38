//! Environment variable names and detection helpers for building a
//! [`LoggerConfig`](crate::init::LoggerConfig) in services.
//!
//! These are purely helpers; the logger itself only ever sees the explicit
//! configuration it is handed.

/// Logical service name stamped on every event.
pub const EVLOG_SERVICE_ENV: &str = "EVLOG_SERVICE";

/// Deployment environment, e.g. `production`. Falls back to [`APP_ENV`].
pub const EVLOG_ENV_ENV: &str = "EVLOG_ENV";

/// Generic deployment environment variable consulted after [`EVLOG_ENV_ENV`].
pub const APP_ENV: &str = "APP_ENV";

/// Deployed version.
pub const EVLOG_VERSION_ENV: &str = "EVLOG_VERSION";

/// Commit hash. Falls back to `COMMIT_SHA`.
pub const EVLOG_COMMIT_SHA_ENV: &str = "EVLOG_COMMIT_SHA";

/// Region. Falls back to `AWS_REGION`, then `FLY_REGION`.
pub const EVLOG_REGION_ENV: &str = "EVLOG_REGION";

/// `true`/`1` forces pretty output, `false`/`0` forces JSON.
pub const EVLOG_PRETTY_ENV: &str = "EVLOG_PRETTY";

/// Service name used when nothing else is configured.
pub const DEFAULT_SERVICE: &str = "app";

/// Static deployment attributes stamped on every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    pub service: String,
    pub environment: String,
    pub version: Option<String>,
    pub commit_hash: Option<String>,
    pub region: Option<String>,
}

impl EnvironmentContext {
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            environment: environment.into(),
            version: None,
            commit_hash: None,
            region: None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment.as_str(), "development" | "dev" | "local")
    }
}

impl Default for EnvironmentContext {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE, default_environment())
    }
}

fn default_environment() -> &'static str {
    if cfg!(debug_assertions) {
        "development"
    } else {
        "production"
    }
}

/// Read the first of `keys` that is set to a non-empty value.
pub fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    first_env(&[key]).unwrap_or_else(|| default.to_string())
}

/// Parse a boolean-ish environment variable.
pub fn env_flag(key: &str) -> Option<bool> {
    match first_env(&[key])?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Build an [`EnvironmentContext`] from the process environment.
pub fn detect_environment() -> EnvironmentContext {
    EnvironmentContext {
        service: env_or(EVLOG_SERVICE_ENV, DEFAULT_SERVICE),
        environment: first_env(&[EVLOG_ENV_ENV, APP_ENV])
            .unwrap_or_else(|| default_environment().to_string()),
        version: first_env(&[EVLOG_VERSION_ENV]),
        commit_hash: first_env(&[EVLOG_COMMIT_SHA_ENV, "COMMIT_SHA"]),
        region: first_env(&[EVLOG_REGION_ENV, "AWS_REGION", "FLY_REGION"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_names() {
        assert!(EnvironmentContext::new("api", "development").is_development());
        assert!(EnvironmentContext::new("api", "local").is_development());
        assert!(!EnvironmentContext::new("api", "production").is_development());
    }

    #[test]
    fn unset_variables_fall_back() {
        assert_eq!(env_or("EVLOG_TEST_SURELY_UNSET_VAR", "fallback"), "fallback");
        assert_eq!(env_flag("EVLOG_TEST_SURELY_UNSET_VAR"), None);
        assert_eq!(first_env(&["EVLOG_TEST_SURELY_UNSET_VAR"]), None);
    }
}

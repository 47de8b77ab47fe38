use crate::client::{ClientConfig, ClientLogger};
use crate::dispatcher::{DrainDispatcher, DrainStats};
use crate::drain::DrainHook;
use crate::env::{detect_environment, env_flag, EnvironmentContext, EVLOG_PRETTY_ENV};
use crate::format::{format_event, ConsoleStream, OutputMode};
use crate::layer::WideEventLayer;
use crate::logger::RequestLogger;
use crate::record::{RequestMeta, WideEvent};
use crate::writer::{ConsoleWriter, EventWriter};
use std::io::IsTerminal;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

/// Process-wide logger configuration, fixed at initialization.
///
/// **Fields**
/// - `env`: service name, environment and deployment attributes stamped
///   on every event.
/// - `pretty`: render pretty tree output instead of one JSON line per event.
/// - `colors`: emit ANSI colors in pretty output.
/// - `drain_buffer`: capacity of the drain queue; contexts beyond it are
///   dropped rather than blocking the request.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub env: EnvironmentContext,
    pub pretty: bool,
    pub colors: bool,
    pub drain_buffer: usize,
}

impl LoggerConfig {
    /// Pretty output in development environments, JSON everywhere else.
    pub fn new(env: EnvironmentContext) -> Self {
        let pretty = env.is_development();
        Self {
            env,
            pretty,
            colors: pretty && std::io::stdout().is_terminal(),
            drain_buffer: 1024,
        }
    }

    /// Build from the process environment, see [`crate::env`].
    pub fn from_env() -> Self {
        let mut config = Self::new(detect_environment());
        if let Some(pretty) = env_flag(EVLOG_PRETTY_ENV) {
            config.pretty = pretty;
            config.colors = pretty && std::io::stdout().is_terminal();
        }
        config
    }

    pub fn mode(&self) -> OutputMode {
        if self.pretty {
            OutputMode::Pretty
        } else {
            OutputMode::Json
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new(EnvironmentContext::default())
    }
}

/// Error type returned during initialization.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("drain hooks need a running Tokio runtime")]
    NoRuntime,

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub(crate) struct Shared {
    pub(crate) config: LoggerConfig,
    pub(crate) writer: Arc<dyn EventWriter>,
    dispatcher: Option<DrainDispatcher>,
}

impl Shared {
    /// Render to the console sink, then hand off to the drain queue.
    pub(crate) fn publish(
        &self,
        event: &WideEvent,
        request: Option<RequestMeta>,
        headers: &[(String, String)],
    ) {
        let line = format_event(event, self.config.mode(), self.config.colors);
        self.writer
            .write_line(ConsoleStream::for_level(event.level), &line);
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.dispatch(
                event.clone(),
                request,
                headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
    }
}

/// Process-wide handle: configuration, console sink and drain queue.
/// Cheap to clone; create one at startup and hand out request loggers.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

impl Logger {
    /// Console output only, no drain hooks. Does not need a runtime.
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                writer: Arc::new(ConsoleWriter),
                dispatcher: None,
            }),
        }
    }

    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder {
            config,
            writer: None,
            hooks: Vec::new(),
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.shared.config
    }

    /// Accumulator for one request, pre-seeded with `method`, `path` and
    /// `requestId`. `headers` are kept raw and filtered only when the
    /// drain context is built.
    pub fn request<I, K, V>(&self, request: RequestMeta, headers: I) -> RequestLogger
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        RequestLogger::bind(Arc::clone(&self.shared), Some(request), headers)
    }

    /// Accumulator outside any HTTP request (jobs, scripts). Its drain
    /// context carries no request descriptor and no headers.
    pub fn detached(&self) -> RequestLogger {
        RequestLogger::bind(Arc::clone(&self.shared), None, Vec::new())
    }

    /// Immediate, non-accumulating logger sharing this logger's service,
    /// mode and console sink. Never drains.
    pub fn log(&self) -> ClientLogger {
        ClientLogger::with_writer(
            ClientConfig::from(&self.shared.config),
            Arc::clone(&self.shared.writer),
        )
    }

    pub fn drain_stats(&self) -> DrainStats {
        self.shared
            .dispatcher
            .as_ref()
            .map(DrainDispatcher::stats)
            .unwrap_or_default()
    }
}

/// Builder for a [`Logger`] with a custom console sink and drain hooks.
pub struct LoggerBuilder {
    config: LoggerConfig,
    writer: Option<Arc<dyn EventWriter>>,
    hooks: Vec<Arc<dyn DrainHook>>,
}

impl LoggerBuilder {
    pub fn writer(mut self, writer: impl EventWriter + 'static) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    pub fn drain(self, hook: impl DrainHook + 'static) -> Self {
        self.drain_arc(Arc::new(hook))
    }

    pub fn drain_arc(mut self, hook: Arc<dyn DrainHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Build the logger. With at least one drain hook this spawns the
    /// dispatcher worker and must run inside a Tokio runtime.
    pub fn build(self) -> Result<Logger, InitError> {
        let dispatcher = if self.hooks.is_empty() {
            None
        } else {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(InitError::NoRuntime);
            }
            let (dispatcher, _handle) = DrainDispatcher::new(self.hooks, self.config.drain_buffer);
            Some(dispatcher)
        };
        Ok(Logger {
            shared: Arc::new(Shared {
                config: self.config,
                writer: self.writer.unwrap_or_else(|| Arc::new(ConsoleWriter)),
                dispatcher,
            }),
        })
    }
}

/// Configuration of the global `tracing` subscriber installed by
/// [`init_tracing_with_config`].
///
/// **Fields**
/// - `capture_level`: minimum level of `tracing` events folded into the
///   current wide event by [`WideEventLayer`].
/// - `enable_stdout`: also print `tracing` events (including this crate's
///   own diagnostics) through a `fmt` layer on stderr.
/// - `diagnostics_level`: maximum verbosity of that `fmt` layer.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub capture_level: tracing::Level,
    pub enable_stdout: bool,
    pub diagnostics_level: tracing::Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            capture_level: tracing::Level::INFO,
            enable_stdout: true,
            diagnostics_level: tracing::Level::INFO,
        }
    }
}

/// Install a global subscriber made of [`WideEventLayer`] and, when
/// `enable_stdout` is set, a `fmt` layer.
pub fn init_tracing_with_config(config: TracingConfig) -> Result<(), InitError> {
    let layer = WideEventLayer::new(config.capture_level);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::from_level(config.diagnostics_level));
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Equivalent to [`init_tracing_with_config`] with [`TracingConfig::default`].
pub fn init_tracing() -> Result<(), InitError> {
    init_tracing_with_config(TracingConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop_drain::NoopDrain;

    #[test]
    fn mode_follows_environment() {
        let dev = LoggerConfig::new(EnvironmentContext::new("api", "development"));
        assert_eq!(dev.mode(), OutputMode::Pretty);
        let prod = LoggerConfig::new(EnvironmentContext::new("api", "production"));
        assert_eq!(prod.mode(), OutputMode::Json);
        assert!(!prod.colors);
    }

    #[test]
    fn drain_hooks_require_runtime() {
        let result = Logger::builder(LoggerConfig::default()).drain(NoopDrain).build();
        assert!(matches!(result, Err(InitError::NoRuntime)));
    }

    #[test]
    fn without_hooks_no_runtime_needed() {
        let logger = Logger::builder(LoggerConfig::default()).build().unwrap();
        assert_eq!(logger.drain_stats(), DrainStats::default());
    }
}

use crate::logger::RequestLogger;
use std::future::Future;

tokio::task_local! {
    static CURRENT: RequestLogger;
}

/// Returned by [`use_logger`] outside a request scope.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    #[error("request logger not initialized: wrap the handler in evlog::scope::scope(..)")]
    NotInitialized,
}

/// Run `fut` with `logger` as the current request logger.
///
/// Handlers deeper in the call chain retrieve it with [`use_logger`]
/// instead of taking it as a parameter.
pub async fn scope<F: Future>(logger: RequestLogger, fut: F) -> F::Output {
    CURRENT.scope(logger, fut).await
}

/// Synchronous variant of [`scope`].
pub fn sync_scope<F, R>(logger: RequestLogger, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(logger, f)
}

/// The request logger of the enclosing [`scope`].
///
/// Fails with [`UsageError::NotInitialized`] when called outside one; that
/// is a wiring defect, so callers should propagate it rather than log it.
pub fn use_logger() -> Result<RequestLogger, UsageError> {
    CURRENT
        .try_with(RequestLogger::clone)
        .map_err(|_| UsageError::NotInitialized)
}

use crate::drain::{DrainContext, DrainHook};
use crate::headers::filter_safe_headers;
use crate::record::{RequestMeta, WideEvent};
use crate::DIAGNOSTICS;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Counters exposed by [`DrainDispatcher::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Contexts accepted into the queue.
    pub enqueued: u64,
    /// Contexts dropped because the queue was full or closed.
    pub dropped: u64,
    /// Hook invocations that returned `Ok`.
    pub delivered: u64,
    /// Hook invocations that returned `Err` or panicked.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Fans finished events out to the registered [`DrainHook`]s.
///
/// `dispatch` only enqueues into a bounded channel and returns
/// immediately. A background task pulls contexts off the channel and
/// runs every hook in its own task, so a hook that errors or panics
/// affects neither the caller nor the other hooks.
#[derive(Clone)]
pub struct DrainDispatcher {
    sender: mpsc::Sender<DrainContext>,
    hook_count: usize,
    counters: Arc<Counters>,
}

impl DrainDispatcher {
    /// Create a dispatcher and spawn its worker on the current Tokio runtime.
    ///
    /// `buffer` is clamped to at least 16. The worker exits once every
    /// clone of the dispatcher has been dropped and the queue is empty.
    pub fn new(hooks: Vec<Arc<dyn DrainHook>>, buffer: usize) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<DrainContext>(buffer);
        let counters = Arc::new(Counters::default());
        let hook_count = hooks.len();

        let counters_bg = Arc::clone(&counters);
        let handle = tokio::spawn(async move {
            while let Some(ctx) = rx.recv().await {
                let ctx = Arc::new(ctx);
                for hook in &hooks {
                    run_hook(Arc::clone(hook), Arc::clone(&ctx), Arc::clone(&counters_bg));
                }
            }
        });

        (
            Self {
                sender: tx,
                hook_count,
                counters,
            },
            handle,
        )
    }

    /// Filter `raw_headers`, build a [`DrainContext`] and queue it.
    ///
    /// Never blocks and never fails: with no hooks registered this is a
    /// no-op, and a full queue drops the context.
    pub fn dispatch<I, K, V>(&self, event: WideEvent, request: Option<RequestMeta>, raw_headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.hook_count == 0 {
            return;
        }
        let ctx = DrainContext {
            event,
            request,
            headers: filter_safe_headers(raw_headers),
        };
        match self.sender.try_send(ctx) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    target: DIAGNOSTICS,
                    error = %e,
                    "drain queue unavailable, dropping wide event"
                );
            }
        }
    }

    pub fn hook_count(&self) -> usize {
        self.hook_count
    }

    pub fn stats(&self) -> DrainStats {
        DrainStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

fn run_hook(hook: Arc<dyn DrainHook>, ctx: Arc<DrainContext>, counters: Arc<Counters>) {
    let task = tokio::spawn(async move { hook.drain(&ctx).await });
    tokio::spawn(async move {
        match task.await {
            Ok(Ok(())) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(target: DIAGNOSTICS, error = %e, "drain hook failed");
            }
            Err(join_err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(target: DIAGNOSTICS, error = %join_err, "drain hook panicked");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop_drain::NoopDrain;
    use crate::record::Level;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Map;
    use std::error::Error;
    use tokio::time::{sleep, timeout, Duration};

    fn event() -> WideEvent {
        WideEvent {
            timestamp: Utc::now(),
            level: Level::Info,
            service: "test".into(),
            environment: "test".into(),
            version: None,
            commit_hash: None,
            region: None,
            fields: Map::new(),
            error: None,
        }
    }

    struct Capture(mpsc::UnboundedSender<DrainContext>);

    #[async_trait]
    impl DrainHook for Capture {
        async fn drain(&self, ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>> {
            let _ = self.0.send(ctx.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl DrainHook for Failing {
        async fn drain(&self, _ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("destination unreachable".into())
        }
    }

    struct Panicking;

    #[async_trait]
    impl DrainHook for Panicking {
        async fn drain(&self, _ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>> {
            panic!("hook bug");
        }
    }

    #[tokio::test]
    async fn context_carries_request_and_filtered_headers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, _handle) = DrainDispatcher::new(vec![Arc::new(Capture(tx))], 16);

        dispatcher.dispatch(
            event(),
            Some(RequestMeta::new("POST", "/api/test").with_request_id("req-123")),
            [
                ("content-type", "application/json"),
                ("authorization", "Bearer secret"),
                ("x-request-id", "test-123"),
            ],
        );

        let ctx = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        let request = ctx.request.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/test");
        assert_eq!(request.request_id.as_deref(), Some("req-123"));
        assert_eq!(ctx.headers.len(), 2);
        assert!(!ctx.headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn failing_hooks_do_not_stop_others() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hooks: Vec<Arc<dyn DrainHook>> =
            vec![Arc::new(Failing), Arc::new(Panicking), Arc::new(Capture(tx))];
        let (dispatcher, _handle) = DrainDispatcher::new(hooks, 16);

        dispatcher.dispatch(event(), None, Vec::<(String, String)>::new());
        dispatcher.dispatch(event(), None, Vec::<(String, String)>::new());

        for _ in 0..2 {
            timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        }
        // Failure bookkeeping happens in supervisor tasks; give them a moment.
        for _ in 0..50 {
            if dispatcher.stats().failed == 4 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        let stats = dispatcher.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.failed, 4);
    }

    #[tokio::test]
    async fn without_hooks_nothing_is_queued() {
        let (dispatcher, _handle) = DrainDispatcher::new(Vec::new(), 16);
        dispatcher.dispatch(event(), None, [("a", "b")]);
        assert_eq!(dispatcher.stats(), DrainStats::default());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (dispatcher, handle) = DrainDispatcher::new(vec![Arc::new(NoopDrain)], 16);
        handle.abort();
        let _ = handle.await;
        for _ in 0..20 {
            dispatcher.dispatch(event(), None, Vec::<(String, String)>::new());
        }
        let stats = dispatcher.stats();
        assert_eq!(stats.enqueued + stats.dropped, 20);
        assert!(stats.dropped >= 4);
    }
}

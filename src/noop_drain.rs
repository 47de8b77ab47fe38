use crate::drain::{DrainContext, DrainHook};
use async_trait::async_trait;
use std::error::Error;

/// A drain hook that accepts and discards every event.
///
/// Useful for measuring dispatch overhead without any external I/O, and
/// for tests that only care about the request path.
#[derive(Clone, Default)]
pub struct NoopDrain;

#[async_trait]
impl DrainHook for NoopDrain {
    async fn drain(&self, _ctx: &DrainContext) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

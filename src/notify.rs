//! Notifier contract: the outbound edge of the reminder pipeline.
//!
//! Transports (chat bot API, push, email) live outside this crate and
//! only need to implement [`Notifier`]. Delivery failures are non-fatal
//! to the scheduler; they are logged and the tick moves on.

use async_trait::async_trait;
use tracing::info;

/// Message delivery contract.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to the opaque recipient identity.
    ///
    /// `action_link` is an optional URL the transport may attach as a
    /// button or footer link.
    async fn send(&self, recipient: &str, text: &str, action_link: Option<&str>)
    -> anyhow::Result<()>;
}

/// Notifier that logs deliveries instead of sending them.
///
/// Useful for local runs and as a stand-in while wiring a transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        action_link: Option<&str>,
    ) -> anyhow::Result<()> {
        info!(
            recipient,
            action_link = action_link.unwrap_or("-"),
            "digest delivery:\n{text}"
        );
        Ok(())
    }
}

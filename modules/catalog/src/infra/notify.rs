use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::Notifier;

/// Notifier that emits each notification as a structured log event.
///
/// Used where no delivery transport is wired in; invalidation consumers can
/// tail the `catalog::notify` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, channel: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        info!(target: "catalog::notify", channel, %payload, "notification");
        Ok(())
    }
}

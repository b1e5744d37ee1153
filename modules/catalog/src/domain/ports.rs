use std::net::IpAddr;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

/// Cache-invalidation / notification sink.
///
/// Delivery is best-effort: callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: &str, payload: serde_json::Value) -> anyhow::Result<()>;
}

/// Send a notification, logging instead of propagating a failure.
pub(crate) async fn notify_best_effort(
    notifier: &dyn Notifier,
    channel: &str,
    payload: serde_json::Value,
) {
    if let Err(e) = notifier.notify(channel, payload).await {
        warn!(channel, error = %e, "notification dropped");
    }
}

/// Identity of the caller for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub actor_id: Option<Uuid>,
    /// Network origin of the request, when the transport knows it.
    pub origin: Option<IpAddr>,
    /// Designated QA identity: skips the allow-list, orders complete at once.
    pub test_identity: bool,
}

impl RequestContext {
    #[must_use]
    pub fn new(actor_id: Uuid) -> Self {
        Self {
            actor_id: Some(actor_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_origin(mut self, origin: IpAddr) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn as_test_identity(mut self) -> Self {
        self.test_identity = true;
        self
    }
}

//! Session expiry notification seam.

use async_trait::async_trait;

/// Invoked when a refresh attempt fails and the session cannot be recovered.
///
/// Called at most once per failed refresh burst, no matter how many requests
/// were waiting on it. The consumer owns user-facing messaging and the
/// redirect to an unauthenticated entry point.
#[async_trait]
pub trait SessionExpiryNotifier: Send + Sync {
    async fn session_expired(&self);
}

/// Default notifier: logs and nothing else.
pub struct LogNotifier;

#[async_trait]
impl SessionExpiryNotifier for LogNotifier {
    async fn session_expired(&self) {
        tracing::warn!("session expired and could not be refreshed, re-authentication required");
    }
}

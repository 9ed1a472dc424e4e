//! Access token type and credential store.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

/// Opaque bearer token for API calls.
///
/// The server enforces expiry; the client never inspects the token contents.
/// Wrapped in [`SecretString`] so it stays out of `Debug` output and logs.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    /// Reveal the raw token for header attachment.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl From<String> for AccessToken {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for AccessToken {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Holder of the current access token.
///
/// The refresh coordinator is the only writer during normal operation; login
/// and logout are the other mutation points.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Option<AccessToken>;

    async fn set(&self, token: AccessToken);

    async fn clear(&self);
}

/// In-memory token store, the default for a client session.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Option<AccessToken> {
        self.slot.read().await.clone()
    }

    async fn set(&self, token: AccessToken) {
        let mut slot = self.slot.write().await;
        *slot = Some(token);
    }

    async fn clear(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }
}

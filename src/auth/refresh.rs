//! Single-flight token refresh coordination.
//!
//! A burst of concurrent 401s must produce exactly one call to the refresh
//! endpoint: the first failing request becomes the leader, every later one
//! subscribes to the in-flight attempt, and the outcome (new token or
//! session-expired failure) is fanned out to all of them in arrival order.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use super::api::{self, TokenResponse};
use super::notifier::SessionExpiryNotifier;
use super::token::{AccessToken, TokenStore};
use crate::client::{EndpointClass, RequestSpec, Transport};
use crate::Error as ClientError;

/// Why a refresh burst failed. `Clone` so one failure can be delivered to
/// every queued waiter.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RefreshError {
    /// The refresh endpoint rejected the session (401-class).
    #[error("refresh endpoint rejected the session")]
    Rejected,

    /// The refresh call failed before producing a verdict.
    #[error("refresh request failed: {0}")]
    Failed(String),

    /// The configured refresh timeout elapsed.
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The configured waiter bound was hit; this caller was never enqueued.
    #[error("refresh waiter queue is full ({0} waiting)")]
    QueueFull(usize),
}

impl RefreshError {
    fn classify(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized { .. } => RefreshError::Rejected,
            ClientError::RefreshFailed(inner) => inner,
            other => RefreshError::Failed(other.to_string()),
        }
    }
}

/// Tuning knobs for the coordinator. Both bounds are off by default; the
/// invoker's own transport timeout governs liveness otherwise.
#[derive(Clone, Debug, Default)]
pub struct RefreshConfig {
    /// Reject subscribers beyond this many queued waiters.
    pub max_waiters: Option<usize>,
    /// Fail the whole burst if the refresh call takes longer than this.
    pub timeout: Option<Duration>,
}

impl RefreshConfig {
    pub fn max_waiters(mut self, bound: usize) -> Self {
        self.max_waiters = Some(bound);
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

/// Performs one refresh call against the refresh endpoint.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> crate::Result<AccessToken>;
}

/// Refresh invoker over HTTP: POST to the refresh endpoint with no body.
/// The session context rides along in the transport's cookie jar.
pub struct HttpRefresher {
    transport: Arc<dyn Transport>,
}

impl HttpRefresher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self) -> crate::Result<AccessToken> {
        let spec = RequestSpec::post(api::REFRESH_PATH).with_class(EndpointClass::Refresh);
        let response = self.transport.send(&spec, None).await?;
        let reply: TokenResponse = response.json()?;
        Ok(AccessToken::new(reply.access_token))
    }
}

type RefreshOutcome = Result<AccessToken, RefreshError>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Owns the single-flight protocol and the pending-request queue.
///
/// Constructed once per client session and shared by handle with the request
/// pipeline. The state lock is only ever held for synchronous transitions,
/// never across an await, so two callers can never both observe `Idle`.
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn SessionExpiryNotifier>,
    config: RefreshConfig,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn SessionExpiryNotifier>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            refresher,
            store,
            notifier,
            config,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Obtain a fresh access token, joining the in-flight refresh if one
    /// exists. Exactly one refresh call is made per burst of callers.
    pub async fn request_refresh(&self) -> RefreshOutcome {
        let rx = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match &mut *state {
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
                RefreshState::Refreshing { waiters } => {
                    if let Some(max) = self.config.max_waiters
                        && waiters.len() >= max
                    {
                        return Err(RefreshError::QueueFull(waiters.len()));
                    }
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    tracing::debug!(waiting = waiters.len(), "refresh in flight, subscribing");
                    Some(rx)
                }
            }
        };

        if let Some(rx) = rx {
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(RefreshError::Failed(
                    "refresh coordinator dropped mid-flight".into(),
                )),
            };
        }

        tracing::debug!("starting token refresh");
        match self.run_refresh().await {
            Ok(token) => {
                self.store.set(token.clone()).await;
                let waiters = self.take_waiters();
                tracing::info!(waiters = waiters.len(), "token refresh succeeded");
                for waiter in waiters {
                    let _ = waiter.send(Ok(token.clone()));
                }
                Ok(token)
            }
            Err(err) => {
                self.store.clear().await;
                let waiters = self.take_waiters();
                tracing::warn!(
                    error = %err,
                    waiters = waiters.len(),
                    "token refresh failed"
                );
                for waiter in waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
                self.notifier.session_expired().await;
                Err(err)
            }
        }
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let call = self.refresher.refresh();
        let result = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(RefreshError::Timeout(limit)),
            },
            None => call.await,
        };
        result.map_err(RefreshError::classify)
    }

    fn take_waiters(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

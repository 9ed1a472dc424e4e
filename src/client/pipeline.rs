//! Request pipeline: credential attachment and the one-shot retry protocol.

use std::sync::Arc;

use super::request::{ApiResponse, EndpointClass, RequestSpec};
use super::transport::Transport;
use crate::auth::{RefreshCoordinator, RefreshError, TokenStore};
use crate::{Error, Result};

/// Wraps every outbound call: attaches the current token, sends, and on a 401
/// drives the refresh coordinator before replaying the request exactly once.
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl RequestPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            store,
            coordinator,
        }
    }

    /// Execute a request. A single logical request moves through
    /// `Initial -> AwaitingRefresh -> Retried -> Terminal`: the first auth
    /// failure joins a refresh and replays once; any second auth failure is
    /// terminal. Login and refresh calls bypass the protocol entirely.
    pub async fn execute(&self, spec: RequestSpec) -> Result<ApiResponse> {
        // Token is read from the store at send time, not captured earlier.
        let token = match spec.class() {
            EndpointClass::Standard => self.store.get().await,
            EndpointClass::Login | EndpointClass::Refresh => None,
        };

        let err = match self.transport.send(&spec, token.as_ref()).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };
        if !err.is_unauthorized() {
            return Err(err);
        }

        match spec.class() {
            EndpointClass::Login => {
                // A 401 here answers the login itself (bad password); a
                // refresh would only mask it.
                tracing::debug!(path = spec.path(), "login rejected, passing through");
                Err(err)
            }
            EndpointClass::Refresh => {
                tracing::debug!(path = spec.path(), "refresh endpoint rejected the session");
                Err(Error::RefreshFailed(RefreshError::Rejected))
            }
            EndpointClass::Standard => {
                // Retry marker set: this request replays at most once, with
                // the credential the coordinator hands back.
                tracing::debug!(path = spec.path(), "access token rejected, joining refresh");
                let fresh = self.coordinator.request_refresh().await?;
                self.transport.send(&spec, Some(&fresh)).await
            }
        }
    }
}

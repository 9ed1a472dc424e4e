//! API client: request pipeline, transport, and the session facade.

mod config;
mod pipeline;
mod request;
mod transport;

pub use config::{API_URL_ENV, ClientConfig};
pub use pipeline::RequestPipeline;
pub use request::{ApiResponse, EndpointClass, RequestSpec};
pub use transport::{HttpTransport, Transport};

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::auth::api::{self, LoginRequest, TokenResponse, TotpVerifyRequest};
use crate::auth::{
    AccessToken, HttpRefresher, LogNotifier, LoginOutcome, MemoryTokenStore, RefreshConfig,
    RefreshCoordinator, SessionExpiryNotifier, TokenRefresher, TokenStore,
};
use crate::Result;

/// One authenticated session against the API.
///
/// Owns a single request pipeline and refresh coordinator; clones share them.
/// Callers issue requests and receive either the response or a rejection,
/// with no visibility into whether a token refresh happened in between.
#[derive(Clone)]
pub struct Client {
    pipeline: Arc<RequestPipeline>,
    store: Arc<dyn TokenStore>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Execute an arbitrary request through the pipeline.
    pub async fn execute(&self, spec: RequestSpec) -> Result<ApiResponse> {
        self.pipeline.execute(spec).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(RequestSpec::get(path)).await?.json()
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(RequestSpec::post(path).json(body)?)
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.execute(RequestSpec::delete(path)).await
    }

    /// Step 1 of login: password check. Stores the access token when the
    /// server issues one directly; otherwise returns the 2FA challenge.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let spec = RequestSpec::post(api::LOGIN_PATH)
            .json(&LoginRequest { username, password })?
            .with_class(EndpointClass::Login);
        let response = self.pipeline.execute(spec).await?;
        let outcome = response.json::<api::LoginReply>()?.into_outcome()?;
        if let LoginOutcome::LoggedIn(token) = &outcome {
            self.store.set(token.clone()).await;
        }
        Ok(outcome)
    }

    /// Step 2 of login: verify a TOTP code using the temp token from step 1.
    /// Pass `secret` only during first-time enrollment.
    pub async fn verify_totp(
        &self,
        temp_token: &str,
        code: &str,
        secret: Option<&str>,
    ) -> Result<AccessToken> {
        let spec = RequestSpec::post(api::TOTP_VERIFY_PATH)
            .json(&TotpVerifyRequest { code, secret })?
            .header("authorization", format!("Bearer {temp_token}"))
            .with_class(EndpointClass::Login);
        let response = self.pipeline.execute(spec).await?;
        let reply: TokenResponse = response.json()?;
        let token = AccessToken::new(reply.access_token);
        self.store.set(token.clone()).await;
        Ok(token)
    }

    /// End the session. The stored token is cleared even if the server call
    /// fails.
    pub async fn logout(&self) -> Result<()> {
        let result = self.execute(RequestSpec::post(api::LOGOUT_PATH)).await;
        self.store.clear().await;
        result.map(|_| ())
    }

    /// Current access token, if any.
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.store.get().await
    }
}

/// Builds a [`Client`], wiring the coordinator and pipeline to one session.
/// Every seam can be swapped out, which is how the test suites drive the
/// protocol without a server.
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<dyn TokenStore>>,
    notifier: Option<Arc<dyn SessionExpiryNotifier>>,
    refresh: RefreshConfig,
    transport: Option<Arc<dyn Transport>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn SessionExpiryNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn refresh_config(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn build(self) -> Result<Client> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let config = match self.config {
                    Some(config) => config,
                    None => ClientConfig::from_env()?,
                };
                Arc::new(HttpTransport::new(&config)?)
            }
        };
        let refresher = self
            .refresher
            .unwrap_or_else(|| Arc::new(HttpRefresher::new(Arc::clone(&transport))));
        let coordinator = Arc::new(RefreshCoordinator::new(
            refresher,
            Arc::clone(&store),
            notifier,
            self.refresh,
        ));
        let pipeline = Arc::new(RequestPipeline::new(
            transport,
            Arc::clone(&store),
            coordinator,
        ));
        Ok(Client { pipeline, store })
    }
}

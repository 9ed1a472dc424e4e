//! # attendtrack-client
//!
//! Client access layer for the AttendTrack API: bearer-token attachment,
//! transparent single-flight token refresh, and one-shot request replay.
//!
//! When an access token expires, any number of in-flight requests may fail
//! with a 401 at once. The first one triggers exactly one call to the refresh
//! endpoint; every other one waits on that same attempt, and all of them are
//! replayed once with the renewed token. If the refresh itself fails, every
//! waiter is rejected, the stored token is cleared, and a session-expiry
//! notifier fires exactly once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use attendtrack_client::{Client, ClientConfig, LoginOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), attendtrack_client::Error> {
//!     let client = Client::builder()
//!         .config(ClientConfig::new("https://attend.example.com/api")?)
//!         .build()?;
//!
//!     match client.login("ana", "hunter2").await? {
//!         LoginOutcome::LoggedIn(_) => {}
//!         challenge => println!("2FA required: {challenge:?}"),
//!     }
//!
//!     // Token refresh on expiry is invisible to callers.
//!     let me: serde_json::Value = client.get("/users/me").await?;
//!     println!("{me}");
//!     Ok(())
//! }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod client;

pub use auth::{
    AccessToken, HttpRefresher, LogNotifier, LoginOutcome, LoginRequest, MemoryTokenStore,
    RefreshConfig, RefreshCoordinator, RefreshError, SessionExpiryNotifier, TokenRefresher,
    TokenResponse, TokenStore, TotpVerifyRequest,
};
pub use client::{
    API_URL_ENV, ApiResponse, Client, ClientBuilder, ClientConfig, EndpointClass, HttpTransport,
    RequestPipeline, RequestSpec, Transport,
};

/// Error type for all client operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport could not be reached or the request failed in flight.
    /// Never treated as an auth failure.
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered 401. The only trigger for the refresh protocol.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The refresh protocol itself failed; the session is over.
    #[error("session refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),

    /// Any non-401 error status, passed through untouched.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A response did not match the expected wire shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this is the 401-class failure that drives the refresh logic.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }

    /// Whether the session is gone for good (failed refresh).
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::RefreshFailed(_))
    }

    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Api {
                    status: 500..=599,
                    ..
                }
        )
    }

    /// HTTP status, when the server produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

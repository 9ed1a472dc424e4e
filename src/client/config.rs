//! Client configuration.

use std::env;
use std::time::Duration;

use url::Url;

use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "ATTENDTRACK_API_URL";

/// Base URL and transport-level settings for a client session.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// API base URL; request paths are appended to it.
    pub base_url: Url,
    /// Per-request timeout applied by the transport.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| Error::Config(format!("invalid base URL: {e}")))?;
        Ok(Self {
            base_url,
            request_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read the base URL from `ATTENDTRACK_API_URL`.
    pub fn from_env() -> Result<Self> {
        let raw = env::var(API_URL_ENV)
            .map_err(|_| Error::Config(format!("{API_URL_ENV} is not set")))?;
        Self::new(raw)
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

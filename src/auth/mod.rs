//! Authentication: token storage, single-flight refresh, identity endpoints.
//!
//! The refresh coordinator is the core of this module; see
//! [`RefreshCoordinator`] for the single-flight protocol. Everything else is
//! a thin seam around it: the store the token lives in, the invoker that
//! calls the refresh endpoint, and the notifier fired when a session is gone
//! for good.

pub mod api;
mod notifier;
mod refresh;
mod token;

pub use api::{LoginOutcome, LoginRequest, TokenResponse, TotpVerifyRequest};
pub use notifier::{LogNotifier, SessionExpiryNotifier};
pub use refresh::{HttpRefresher, RefreshConfig, RefreshCoordinator, RefreshError, TokenRefresher};
pub use token::{AccessToken, MemoryTokenStore, TokenStore};

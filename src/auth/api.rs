//! Wire contract for the identity endpoints.
//!
//! These endpoints are opaque to the refresh coordinator; the types here
//! mirror the backend schema exactly.

use serde::{Deserialize, Serialize};

use super::token::AccessToken;
use crate::{Error, Result};

pub const LOGIN_PATH: &str = "/auth/login";
pub const TOTP_VERIFY_PATH: &str = "/auth/2fa/verify";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Body of the login password check (step 1).
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token payload returned by the refresh and 2FA verify endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

/// Body of the TOTP verify call (step 2). `secret` is only present during
/// first-time enrollment, before the server has stored one.
#[derive(Debug, Serialize)]
pub struct TotpVerifyRequest<'a> {
    pub code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<&'a str>,
}

/// What the password check answered.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Full tokens issued directly (2FA disabled server-side).
    LoggedIn(AccessToken),
    /// First login on this account: enroll a TOTP secret, then verify.
    TwoFactorSetupRequired { temp_token: String },
    /// TOTP already enrolled: verify a code to finish.
    TwoFactorVerifyRequired { temp_token: String },
}

/// Raw login reply; the three outcome shapes share one endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginReply {
    access_token: Option<String>,
    #[serde(default)]
    requires_2fa_setup: bool,
    #[serde(default)]
    requires_2fa_verify: bool,
    temp_token: Option<String>,
}

impl LoginReply {
    pub(crate) fn into_outcome(self) -> Result<LoginOutcome> {
        if let Some(token) = self.access_token {
            return Ok(LoginOutcome::LoggedIn(AccessToken::new(token)));
        }
        match (self.requires_2fa_setup, self.requires_2fa_verify, self.temp_token) {
            (true, _, Some(temp_token)) => Ok(LoginOutcome::TwoFactorSetupRequired { temp_token }),
            (_, true, Some(temp_token)) => Ok(LoginOutcome::TwoFactorVerifyRequired { temp_token }),
            _ => Err(Error::Parse(
                "login reply carried neither tokens nor a 2FA challenge".into(),
            )),
        }
    }
}

//! Nitrapi Authentication
//!
//! Nitrapi uses long-lived OAuth access tokens sent as bearer credentials.
//! Tokens come from the command line, the environment or the config file.

use super::error::{Error, Result};
use std::fmt;

/// Environment variable holding the access token
pub const TOKEN_ENV: &str = "NITRAPI_ACCESS_TOKEN";

/// Bearer token for API calls
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Validate and wrap a raw token
    /// Security: rejects whitespace and control characters that would corrupt the header
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let token = raw.trim();

        if token.is_empty() {
            return Err(Error::Config("access token is empty".to_string()));
        }
        if !token.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::Config(
                "access token contains invalid characters".to_string(),
            ));
        }

        Ok(Self(token.to_string()))
    }

    /// Read the token from the environment, if set and well-formed
    pub fn from_env() -> Option<Self> {
        let raw = std::env::var(TOKEN_ENV).ok()?;
        match Self::new(raw) {
            Ok(token) => Some(token),
            Err(_) => {
                tracing::warn!("Ignoring malformed token in {}", TOKEN_ENV);
                None
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Security: never print the token itself
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***{} chars)", self.0.len())
    }
}

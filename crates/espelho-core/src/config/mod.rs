//! Sync engine configuration

use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(12);
const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Configuration for the sync engine.
///
/// The authenticated identity (user email) is supplied externally by the
/// sign-in flow; this crate never derives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the sync API (e.g. `https://api.example.com`)
    pub endpoint: String,
    /// Acting user's email; keys the snapshot pull and derived memberships
    pub user_email: String,
    /// Optional bearer token attached to every request
    pub auth_token: Option<String>,
    /// Explicit timeout for the batch upload and the snapshot fetch
    pub upload_timeout: Duration,
    /// Quiet window applied to connectivity transitions before triggering
    pub debounce: Duration,
}

impl SyncConfig {
    /// Create a configuration, validating endpoint and identity
    pub fn new(endpoint: impl Into<String>, user_email: impl Into<String>) -> Result<Self> {
        let endpoint = normalize_text_option(Some(endpoint.into()))
            .ok_or_else(|| Error::InvalidInput("sync endpoint must not be empty".into()))?;
        if !is_http_url(&endpoint) {
            return Err(Error::InvalidInput(
                "sync endpoint must include http:// or https://".into(),
            ));
        }
        let user_email = normalize_text_option(Some(user_email.into()))
            .ok_or_else(|| Error::InvalidInput("user email must not be empty".into()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            user_email,
            auth_token: None,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
        })
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = normalize_text_option(Some(token.into()));
        self
    }

    /// Set the upload timeout
    #[must_use]
    pub const fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set the connectivity debounce window
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_endpoints() {
        assert!(SyncConfig::new("", "a@b.c").is_err());
        assert!(SyncConfig::new("api.example.com", "a@b.c").is_err());
        assert!(SyncConfig::new("https://api.example.com", "  ").is_err());
    }

    #[test]
    fn new_trims_trailing_slash_and_applies_defaults() {
        let config = SyncConfig::new("https://api.example.com/", "a@b.c").unwrap();
        assert_eq!(config.endpoint, "https://api.example.com");
        assert_eq!(config.upload_timeout, Duration::from_secs(12));
        assert_eq!(config.debounce, Duration::from_secs(2));
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn blank_auth_token_is_dropped() {
        let config = SyncConfig::new("https://api.example.com", "a@b.c")
            .unwrap()
            .with_auth_token("   ");
        assert!(config.auth_token.is_none());
    }
}

//! Configuration for the deal synchronizer.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scheduler::OverlapPolicy;

/// Zoho accounts endpoint for the refresh-token grant.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.zoho.com/oauth/v2/token";

/// Zoho CRM API host.
pub const DEFAULT_CRM_API_URL: &str = "https://www.zohoapis.com";

/// Trello REST API host.
pub const DEFAULT_TRELLO_API_URL: &str = "https://api.trello.com";

/// Default period between sync cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// CRM (Zoho) OAuth client settings.
#[derive(Clone)]
pub struct CrmConfig {
    /// Long-lived OAuth refresh token.
    pub refresh_token: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered for the OAuth client. Not sent on refresh.
    pub redirect_uri: Option<String>,
    /// Token endpoint URL.
    pub token_url: String,
    /// CRM API base URL (without the `/crm/v2` path).
    pub api_url: String,
}

impl CrmConfig {
    /// Create CRM settings pointing at the public Zoho endpoints.
    #[must_use]
    pub fn new(
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_CRM_API_URL.to_string(),
        }
    }
}

impl fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmConfig")
            .field("refresh_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_url", &self.token_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Trello API credentials.
#[derive(Clone)]
pub struct TrelloConfig {
    /// Trello API key.
    pub api_key: String,
    /// Trello member token.
    pub access_token: String,
    /// Trello API base URL.
    pub api_url: String,
}

impl TrelloConfig {
    /// Create Trello settings pointing at the public API.
    #[must_use]
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: access_token.into(),
            api_url: DEFAULT_TRELLO_API_URL.to_string(),
        }
    }
}

impl fmt::Debug for TrelloConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrelloConfig")
            .field("api_key", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Scheduling settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period between cycle starts.
    pub interval: Duration,
    /// What to do when a tick fires while a cycle is still running.
    pub overlap: OverlapPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            overlap: OverlapPolicy::default(),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub crm: CrmConfig,
    pub trello: TrelloConfig,
    pub scheduler: SchedulerConfig,
    /// Persist the new board id onto the CRM deal. Off by default: the board id is
    /// only recorded on the in-memory record.
    pub write_back: bool,
}

impl Config {
    /// Check that every required credential is non-empty and the period is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("ZOHO_REFRESH_TOKEN", &self.crm.refresh_token),
            ("ZOHO_CLIENT_ID", &self.crm.client_id),
            ("ZOHO_CLIENT_SECRET", &self.crm.client_secret),
            ("TRELLO_API_KEY", &self.trello.api_key),
            ("TRELLO_ACCESS_TOKEN", &self.trello.access_token),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }

        if self.scheduler.interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SYNC_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            crm: CrmConfig::new("refresh", "client", "secret"),
            trello: TrelloConfig::new("key", "token"),
            scheduler: SchedulerConfig::default(),
            write_back: false,
        }
    }

    #[test]
    fn test_defaults_point_at_public_endpoints() {
        let config = sample();
        assert_eq!(config.crm.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.crm.api_url, DEFAULT_CRM_API_URL);
        assert_eq!(config.trello.api_url, DEFAULT_TRELLO_API_URL);
        assert_eq!(config.scheduler.interval, Duration::from_secs(60));
        assert_eq!(config.scheduler.overlap, OverlapPolicy::Allow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_secret() {
        let mut config = sample();
        config.trello.access_token = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("TRELLO_ACCESS_TOKEN"))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = sample();
        config.scheduler.interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "SYNC_INTERVAL_SECS", .. })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("refresh\""));
        assert!(!rendered.contains("secret\""));
        assert!(!rendered.contains("\"token\""));
        assert!(rendered.contains("<redacted>"));
    }
}

//! OAuth access token for the Zoho CRM API.
//!
//! The token is obtained with a refresh-token grant the first time it is needed
//! and then reused for the lifetime of the process. It is never refreshed on
//! expiry; only an empty cache triggers a refresh.

use std::fmt;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::CrmConfig;
use crate::error::TokenRefreshError;

/// Token endpoint response. Zoho reports grant failures as 200 with an `error` field.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Caches the CRM bearer token and refreshes it when absent.
pub struct TokenProvider {
    client: Client,
    token_url: String,
    refresh_token: String,
    client_id: String,
    client_secret: String,
    /// Held across the refresh call so concurrent cycles share a single refresh.
    cached: Mutex<Option<String>>,
}

impl TokenProvider {
    /// Create a provider for the given CRM credentials.
    #[must_use]
    pub fn new(client: Client, config: &CrmConfig) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            refresh_token: config.refresh_token.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token, refreshing it first when none is cached.
    ///
    /// A failed refresh leaves the cache empty, so the next call tries again.
    pub async fn access_token(&self) -> Result<String, TokenRefreshError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_empty()) {
            debug!("Using cached access token");
            return Ok(token.clone());
        }

        let token = self.refresh().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Perform the refresh-token grant against the token endpoint.
    #[instrument(skip(self), fields(token_url = %self.token_url))]
    pub async fn refresh(&self) -> Result<String, TokenRefreshError> {
        let params = [
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!(status = %status, body = %body, "Failed to refresh access token");
            return Err(TokenRefreshError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| TokenRefreshError::MissingAccessToken {
                detail: format!("unreadable body ({e})"),
            })?;

        match parsed.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                info!("Refreshed CRM access token");
                Ok(token)
            }
            None => {
                let detail = parsed.error.unwrap_or_else(|| "no access_token field".to_string());
                warn!(detail = %detail, "Access token not found in response");
                Err(TokenRefreshError::MissingAccessToken { detail })
            }
        }
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

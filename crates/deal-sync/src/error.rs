//! Error types for the deal synchronizer.

use thiserror::Error;

/// Errors raised while refreshing the CRM access token.
#[derive(Debug, Error)]
pub enum TokenRefreshError {
    /// The token endpoint could not be reached.
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with something other than 200 OK.
    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not carry a usable `access_token`.
    #[error("Access token not found in response: {detail}")]
    MissingAccessToken { detail: String },
}

/// Errors raised while talking to the CRM deals API.
#[derive(Debug, Error)]
pub enum CrmError {
    /// No access token is available for the request.
    #[error("No access token available: {0}")]
    Auth(#[from] TokenRefreshError),

    /// HTTP transport failure.
    #[error("CRM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The CRM returned a non-2xx status.
    #[error("CRM API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The deals payload was not valid JSON.
    #[error("Malformed deals payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CrmError {
    /// Whether this error means the request never reached the deals endpoint.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Errors raised by board, list or card calls against the board service.
#[derive(Debug, Error)]
pub enum BoardProvisioningError {
    /// HTTP transport failure.
    #[error("Board service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The board service returned a non-2xx status.
    #[error("Board service error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The board service answered 2xx with a body we could not read.
    #[error("Unexpected board service response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting was present but could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

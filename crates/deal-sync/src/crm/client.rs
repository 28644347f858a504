//! REST client for Zoho CRM deals.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::models::{DealsResponse, BOARD_ID_FIELD};
use super::token::TokenProvider;
use crate::error::CrmError;

/// Path of the deals module under the API host.
const DEALS_PATH: &str = "/crm/v2/Deals";

/// Zoho CRM deals client.
#[derive(Debug, Clone)]
pub struct CrmClient {
    client: Client,
    api_url: String,
    tokens: Arc<TokenProvider>,
}

impl CrmClient {
    /// Create a client for the CRM at `api_url`, authenticating through `tokens`.
    #[must_use]
    pub fn new(client: Client, api_url: &str, tokens: Arc<TokenProvider>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn deals_url(&self) -> String {
        format!("{}{DEALS_PATH}", self.api_url)
    }

    /// Fetch the raw deals payload.
    ///
    /// Fails with [`CrmError::Auth`] when no access token can be obtained and with
    /// [`CrmError::Api`] / [`CrmError::Http`] when the request itself fails.
    #[instrument(skip(self))]
    pub async fn fetch_deals(&self) -> Result<String, CrmError> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .get(self.deals_url())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CrmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!(bytes = body.len(), "Fetched deals payload");
        Ok(body)
    }

    /// Record a board id on a deal.
    #[instrument(skip(self))]
    pub async fn update_deal_board_id(&self, deal_id: &str, board_id: &str) -> Result<(), CrmError> {
        let token = self.tokens.access_token().await?;
        let body = json!({
            "data": [{ "id": deal_id, BOARD_ID_FIELD: board_id }]
        });

        let response = self
            .client
            .put(self.deals_url())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Deal updated");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %message, "Deal update rejected");
            Err(CrmError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Parse a deals payload.
///
/// Zoho answers `204 No Content` when there are no records; a blank body is an
/// empty batch.
pub fn parse_deals(body: &str) -> Result<DealsResponse, CrmError> {
    if body.trim().is_empty() {
        return Ok(DealsResponse::default());
    }
    Ok(serde_json::from_str(body)?)
}

//! Trello REST client.
//!
//! Every call authenticates with the `key` / `token` query parameters. Calls are
//! independent: no batching, no retries, no rate limiting.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::models::{
    Board, BoardList, CreatedList, ProvisionOutcome, PROJECT_LISTS, STARTER_CARDS, STARTER_LIST,
};
use super::BoardProvisioner;
use crate::config::TrelloConfig;
use crate::error::BoardProvisioningError;

/// Trello API client.
#[derive(Clone)]
pub struct TrelloClient {
    client: Client,
    api_url: String,
    api_key: String,
    token: String,
}

impl TrelloClient {
    /// Create a new Trello client.
    #[must_use]
    pub fn new(client: Client, config: &TrelloConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            token: config.access_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [("key", self.api_key.as_str()), ("token", self.token.as_str())]
    }

    /// Authenticated GET.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BoardProvisioningError> {
        debug!(path = %path, "GET request");

        let response = self
            .client
            .get(self.url(path))
            .query(&self.auth())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Authenticated POST with all parameters in the query string.
    async fn post(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, BoardProvisioningError> {
        debug!(path = %path, "POST request");

        let response = self
            .client
            .post(self.url(path))
            .query(params)
            .query(&self.auth())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(BoardProvisioningError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Decode a JSON body from a 2xx response.
    async fn handle_response<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, BoardProvisioningError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                BoardProvisioningError::Serialization(e)
            })
        } else {
            Err(BoardProvisioningError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Boards visible to the token's member.
    pub async fn list_boards(&self) -> Result<Vec<Board>, BoardProvisioningError> {
        self.get("/1/members/me/boards").await
    }

    /// Create a list on a board. Creating the starter list also seeds its cards.
    ///
    /// Card failures are logged and do not fail the list.
    #[instrument(skip(self))]
    pub async fn create_list(
        &self,
        name: &str,
        board_id: &str,
    ) -> Result<CreatedList, BoardProvisioningError> {
        let response = self
            .post("/1/lists", &[("name", name), ("idBoard", board_id)])
            .await?;
        let list: BoardList = Self::handle_response(response).await?;
        debug!(list_id = %list.id, "List created");

        let mut cards_created = 0;
        if name == STARTER_LIST {
            for card in STARTER_CARDS {
                match self.create_card(card, &list.id).await {
                    Ok(()) => cards_created += 1,
                    Err(e) => {
                        warn!(card = %card, list_id = %list.id, error = %e, "Failed to create card");
                    }
                }
            }
        }

        Ok(CreatedList {
            list,
            cards_created,
        })
    }

    /// Create a card whose name and description are both `name`.
    #[instrument(skip(self))]
    pub async fn create_card(&self, name: &str, list_id: &str) -> Result<(), BoardProvisioningError> {
        self.post(
            "/1/cards",
            &[("name", name), ("desc", name), ("idList", list_id)],
        )
        .await?;
        info!(card = %name, "Card created");
        Ok(())
    }
}

#[async_trait]
impl BoardProvisioner for TrelloClient {
    fn name(&self) -> &'static str {
        "trello"
    }

    #[instrument(skip(self))]
    async fn find_board_by_name(
        &self,
        name: &str,
    ) -> Result<Option<String>, BoardProvisioningError> {
        let boards = self.list_boards().await?;
        Ok(boards.into_iter().find(|b| b.name == name).map(|b| b.id))
    }

    #[instrument(skip(self))]
    async fn create_board(&self, name: &str) -> Result<ProvisionOutcome, BoardProvisioningError> {
        let existing = match self.find_board_by_name(name).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(error = %e, "Board lookup failed, treating board as missing");
                None
            }
        };

        if let Some(board_id) = existing {
            info!(board_id = %board_id, "Board already exists");
            return Ok(ProvisionOutcome::AlreadyExists { board_id });
        }

        let response = self.post("/1/boards/", &[("name", name)]).await?;
        let board: Board = Self::handle_response(response).await?;
        info!(board_id = %board.id, "Board created");

        let mut lists_created = 0;
        let mut cards_created = 0;
        for list_name in PROJECT_LISTS {
            match self.create_list(list_name, &board.id).await {
                Ok(created) => {
                    lists_created += 1;
                    cards_created += created.cards_created;
                }
                Err(e) => {
                    warn!(
                        list = %list_name,
                        board_id = %board.id,
                        error = %e,
                        "Failed to create list"
                    );
                }
            }
        }

        Ok(ProvisionOutcome::Created {
            board,
            lists_created,
            cards_created,
        })
    }
}

impl std::fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

//! Task-board provisioning.
//!
//! [`BoardProvisioner`] is the seam the synchronizer talks to; [`TrelloClient`]
//! implements it against the Trello REST API.

pub mod models;
pub mod trello;

use async_trait::async_trait;

use crate::error::BoardProvisioningError;

pub use models::{Board, BoardList, CreatedList, ProvisionOutcome};
pub use trello::TrelloClient;

/// A service that can look up and create project boards.
#[async_trait]
pub trait BoardProvisioner: Send + Sync {
    /// Name of the backing service, for logs.
    fn name(&self) -> &'static str;

    /// Id of the first board whose name matches exactly, if any.
    ///
    /// Board names are not unique on the remote side; the first match wins.
    async fn find_board_by_name(&self, name: &str)
        -> Result<Option<String>, BoardProvisioningError>;

    /// Create a board with the standard lists and starter cards.
    ///
    /// An existing board with the same name short-circuits to
    /// [`ProvisionOutcome::AlreadyExists`] without touching its lists.
    async fn create_board(&self, name: &str) -> Result<ProvisionOutcome, BoardProvisioningError>;
}

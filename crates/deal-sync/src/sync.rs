//! Deal synchronizer: fetch deals, filter them, provision boards.
//!
//! Failures are contained at the smallest unit that produced them. A fetch or
//! parse failure ends the cycle; a board failure skips only that deal.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::boards::{BoardProvisioner, ProvisionOutcome, TrelloClient};
use crate::config::Config;
use crate::crm::{parse_deals, CrmClient, Deal, TokenProvider};
use crate::scheduler::SyncJob;

/// Counters for one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    /// The cycle ended before any deal was looked at.
    pub aborted: bool,
    pub scanned: usize,
    pub qualified: usize,
    pub provisioned: usize,
    pub already_existed: usize,
    pub failed: usize,
    pub written_back: usize,
    pub write_back_failed: usize,
}

impl SyncReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            aborted: false,
            scanned: 0,
            qualified: 0,
            provisioned: 0,
            already_existed: 0,
            failed: 0,
            written_back: 0,
            write_back_failed: 0,
        }
    }

    fn aborted(started_at: DateTime<Utc>) -> Self {
        Self {
            aborted: true,
            ..Self::new(started_at)
        }
    }
}

/// Polls CRM deals and provisions a board for each qualifying one.
pub struct DealSynchronizer {
    crm: CrmClient,
    boards: Arc<dyn BoardProvisioner>,
    write_back: bool,
}

impl DealSynchronizer {
    #[must_use]
    pub fn new(crm: CrmClient, boards: Arc<dyn BoardProvisioner>, write_back: bool) -> Self {
        Self {
            crm,
            boards,
            write_back,
        }
    }

    /// Wire up the Zoho and Trello clients from configuration.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let http = crate::http_client()?;
        let tokens = Arc::new(TokenProvider::new(http.clone(), &config.crm));
        let crm = CrmClient::new(http.clone(), &config.crm.api_url, tokens);
        let boards = Arc::new(TrelloClient::new(http, &config.trello));
        Ok(Self::new(crm, boards, config.write_back))
    }

    /// Run one cycle. Never fails; the outcome is in the returned report.
    #[instrument(name = "sync_cycle", skip(self))]
    pub async fn run(&self) -> SyncReport {
        let started_at = Utc::now();

        let body = match self.crm.fetch_deals().await {
            Ok(body) => body,
            Err(e) if e.is_auth() => {
                error!(error = %e, "Failed to obtain access token, skipping cycle");
                return SyncReport::aborted(started_at);
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch data from CRM");
                return SyncReport::aborted(started_at);
            }
        };

        let mut deals = match parse_deals(&body) {
            Ok(response) => response.data,
            Err(e) => {
                error!(error = %e, "Error parsing deals payload");
                return SyncReport::aborted(started_at);
            }
        };

        let mut report = self.process_deals(&mut deals).await;
        report.started_at = started_at;

        info!(
            scanned = report.scanned,
            qualified = report.qualified,
            provisioned = report.provisioned,
            already_existed = report.already_existed,
            failed = report.failed,
            written_back = report.written_back,
            "Sync cycle complete"
        );
        report
    }

    /// Provision boards for every qualifying deal.
    ///
    /// The board id is recorded on the in-memory deal; it is only sent back to the
    /// CRM when write-back is enabled.
    pub async fn process_deals(&self, deals: &mut [Deal]) -> SyncReport {
        let mut report = SyncReport::new(Utc::now());

        for deal in deals.iter_mut() {
            report.scanned += 1;
            if !deal.qualifies() {
                continue;
            }
            report.qualified += 1;

            let board_name = deal.board_name();
            let outcome = match self.boards.create_board(&board_name).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        deal = %deal.display_name(),
                        service = self.boards.name(),
                        error = %e,
                        "Failed to create board for deal"
                    );
                    continue;
                }
            };

            if outcome.is_created() {
                report.provisioned += 1;
            } else {
                report.already_existed += 1;
            }

            let board_id = self.resolve_board_id(&board_name, &outcome).await;
            debug!(deal = %deal.display_name(), board_id = %board_id, "Linked board to deal");
            deal.project_board_id = Some(board_id.clone());

            if self.write_back {
                self.write_back_board_id(deal, &board_id, &mut report).await;
            }
        }

        report
    }

    /// Look the board up by name again; fall back to the id from the outcome.
    async fn resolve_board_id(&self, board_name: &str, outcome: &ProvisionOutcome) -> String {
        match self.boards.find_board_by_name(board_name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(board = %board_name, "Board not listed yet, using id from create response");
                outcome.board_id().to_string()
            }
            Err(e) => {
                warn!(board = %board_name, error = %e, "Board lookup failed, using id from create response");
                outcome.board_id().to_string()
            }
        }
    }

    async fn write_back_board_id(&self, deal: &Deal, board_id: &str, report: &mut SyncReport) {
        let Some(deal_id) = deal.id.as_deref() else {
            warn!(deal = %deal.display_name(), "Deal has no id, cannot record board id");
            report.write_back_failed += 1;
            return;
        };

        match self.crm.update_deal_board_id(deal_id, board_id).await {
            Ok(()) => report.written_back += 1,
            Err(e) => {
                report.write_back_failed += 1;
                error!(deal = %deal.display_name(), error = %e, "Failed to record board id on deal");
            }
        }
    }
}

#[async_trait]
impl SyncJob for DealSynchronizer {
    async fn run_cycle(&self) {
        self.run().await;
    }
}

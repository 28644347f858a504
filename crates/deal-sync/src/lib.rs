//! Zoho CRM to Trello deal synchronizer.
//!
//! This crate provides:
//! - OAuth token caching for the Zoho CRM API
//! - A Zoho CRM deals client and lenient deal records
//! - A Trello client that provisions project boards with fixed lists and cards
//! - The deal synchronizer that ties them together
//! - A fixed-rate scheduler with a configurable overlap policy

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Most async API methods can fail

pub mod boards;
pub mod config;
pub mod crm;
pub mod error;
pub mod scheduler;
pub mod sync;

use std::time::Duration;

pub use boards::{BoardProvisioner, ProvisionOutcome, TrelloClient};
pub use config::{Config, CrmConfig, SchedulerConfig, TrelloConfig};
pub use crm::{CrmClient, Deal, TokenProvider};
pub use error::{BoardProvisioningError, ConfigError, CrmError, TokenRefreshError};
pub use scheduler::{OverlapPolicy, Scheduler, SchedulerStats, SyncJob};
pub use sync::{DealSynchronizer, SyncReport};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client shared by the CRM and Trello clients.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent(concat!("deal-sync/", env!("CARGO_PKG_VERSION")))
        .build()
}

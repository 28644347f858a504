//! Zoho CRM access: OAuth token, deals client and deal records.

pub mod client;
pub mod models;
pub mod token;

pub use client::{parse_deals, CrmClient};
pub use models::{Deal, DealsResponse};
pub use token::TokenProvider;

//! REST client for the open-banking provider (Nordigen v2 API).
//!
//! The provider is a collaborator, not reimplemented: this module only
//! shapes requests, checks statuses and deserializes payloads.

pub mod client;
pub mod types;

pub use client::ProviderClient;
pub use types::{Institution, RefreshResponse, RequisitionResponse, TokenResponse};

pub mod accounts;
pub mod auth;
pub mod budget;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod normalize;
pub mod categorize;
pub mod provider;
pub mod requisition;
pub mod session;
pub mod token;

pub use crypto::TokenCipher;
pub use error::BudgetError;
pub use provider::ProviderClient;
pub use token::{Token, TokenStore};

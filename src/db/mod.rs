//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `storage.rs`: keyed CRUD over the pool

pub mod models;
pub mod schema;
pub mod storage;

pub use models::{AccountRow, RequisitionRow, TokenRow, UserRow};
pub use schema::SQLITE_INIT;
pub use storage::{SqlitePool, Storage};

//! Database module: models, schema and storage operations.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: `CrmStorage`, connection setup and shared helpers
//! - one file per resource with the `CrmStorage` operations for it

pub mod activity;
pub mod clients;
pub mod dashboard;
pub mod follow_ups;
pub mod models;
pub mod notes;
pub mod projects;
pub mod proposals;
pub mod schema;
pub mod seed;
pub mod sqlite;

pub use schema::SQLITE_INIT;
pub use sqlite::{CrmStorage, SqlitePool};

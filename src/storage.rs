//! Storage subsystem
//!
//! This module provides the key-value persistence the annotation core
//! consumes: load-by-key, save-by-key, exists-by-key and list-by-prefix.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform API.
//! - `types`: the key namespace helpers and the `Fields` document type.
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `file_storage`: filesystem-backed implementation for simple persistence and inspection.
//! - `db_entities`: SeaORM entity models for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use database_storage::DatabaseStorage;
pub use file_storage::FileStorage;
pub use storage_trait::Storage;
pub use types::Fields;

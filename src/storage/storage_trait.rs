//! Storage Trait
//!
//! This module defines the `Storage` trait, the key-value interface every
//! persistence backend exposes to the annotation core.
//!
//! Implementors of this trait are responsible for:
//! - Loading a structured document by key
//! - Saving a field set under a key (overwriting only that key)
//! - Answering existence checks
//! - Listing every key stored under a prefix, in ascending key order
//!
//! All fallible methods return a `Result` to handle potential storage errors.

use serde_json::Value;

use crate::error_handling::types::StorageError;
use crate::storage::types::Fields;

/// The `Storage` trait defines the interface for key-value storage backends.
///
/// Keys are `/`-joined path segments such as
/// `project/submissions/000001/default_worker/1700000000000`. Backends give
/// no guarantee beyond per-key atomicity.
pub trait Storage: Send + Sync {
    /// Loads the document stored at `key`.
    ///
    /// Returns `StorageError::NotFound` when nothing is stored there.
    fn load(&self, key: &str) -> Result<Value, StorageError>;

    /// Saves `fields` at `key`, replacing any previous document at that key.
    fn save(&self, key: &str, fields: &Fields) -> Result<(), StorageError>;

    /// Returns whether a document is stored at `key`.
    fn has_key(&self, key: &str) -> bool;

    /// Lists every key strictly below `prefix`, sorted ascending.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

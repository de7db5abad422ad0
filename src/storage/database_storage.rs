use std::path::Path;

use log::{debug, error, info};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Statement,
};
use serde_json::Value;

use crate::error_handling::types::StorageError;
use crate::storage::db_entities::{ActiveModel, Column, Entity};
use crate::storage::storage_trait::Storage;
use crate::storage::types::{validate_key, Fields};

/// SQLite-backed key-value store.
///
/// The `Storage` trait is synchronous, so the backend owns a small
/// current-thread runtime and blocks on it for every call. Callers inside an
/// async context must go through `spawn_blocking`.
pub struct DatabaseStorage {
    rt: tokio::runtime::Runtime,
    db: DatabaseConnection,
}

impl DatabaseStorage {
    /// Default database filename, relative to the data directory
    pub const DEFAULT_DB_FILE: &'static str = "labelkeep.sqlite3";

    /// Creates or opens the SQLite file at `path`.
    pub fn new_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        let url = format!("sqlite://{}?mode=rwc", path_ref.display());
        let db = rt.block_on(async {
            let db = Database::connect(url.as_str()).await.map_err(|e| {
                error!("Failed to open database {}: {}", path_ref.display(), e);
                StorageError::ConnectionFailed(e.to_string())
            })?;
            db.execute(Statement::from_string(
                db.get_database_backend(),
                "CREATE TABLE IF NOT EXISTS records (
                    record_key TEXT PRIMARY KEY NOT NULL,
                    json TEXT NOT NULL
                );",
            ))
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            Ok::<_, StorageError>(db)
        })?;
        info!("DatabaseStorage initialized at {}", path_ref.display());
        Ok(Self { rt, db })
    }
}

impl Storage for DatabaseStorage {
    fn load(&self, key: &str) -> Result<Value, StorageError> {
        validate_key(key)?;
        self.rt.block_on(async {
            let row = Entity::find_by_id(key.to_string())
                .one(&self.db)
                .await
                .map_err(|e| StorageError::ReadFailed(e.to_string()))?
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
            let value = serde_json::from_str(&row.json).map_err(|e| {
                error!("Invalid JSON stored at {}: {}", key, e);
                StorageError::ReadFailed(e.to_string())
            })?;
            debug!("Loaded {} from database", key);
            Ok(value)
        })
    }

    fn save(&self, key: &str, fields: &Fields) -> Result<(), StorageError> {
        validate_key(key)?;
        let json = serde_json::to_string(fields).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        self.rt.block_on(async {
            let record = ActiveModel {
                record_key: Set(key.to_string()),
                json: Set(json),
            };
            Entity::insert(record)
                .on_conflict(
                    OnConflict::column(Column::RecordKey)
                        .update_column(Column::Json)
                        .to_owned(),
                )
                .exec(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to save {}: {}", key, e);
                    StorageError::WriteFailed(e.to_string())
                })?;
            info!("Saved {} to database", key);
            Ok(())
        })
    }

    fn has_key(&self, key: &str) -> bool {
        if validate_key(key).is_err() {
            return false;
        }
        self.rt.block_on(async {
            matches!(
                Entity::find_by_id(key.to_string()).one(&self.db).await,
                Ok(Some(_))
            )
        })
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_key(prefix)?;
        let scoped = format!("{}/", prefix);
        self.rt.block_on(async {
            let rows = Entity::find()
                .filter(Column::RecordKey.starts_with(scoped.as_str()))
                .order_by_asc(Column::RecordKey)
                .all(&self.db)
                .await
                .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            // LIKE treats `_` as a wildcard, so re-check the literal prefix
            let keys: Vec<String> = rows
                .into_iter()
                .map(|row| row.record_key)
                .filter(|k| k.starts_with(&scoped))
                .collect();
            debug!("Listed {} key(s) under {}", keys.len(), prefix);
            Ok(keys)
        })
    }
}

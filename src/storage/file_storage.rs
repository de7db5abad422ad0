use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde_json::Value;

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::{validate_key, Fields};

const DOCUMENT_EXTENSION: &str = "json";

/// Filesystem-backed key-value store.
///
/// Each key maps to one JSON document at `<base>/<key>.json`, so the key
/// namespace is browsable with ordinary tools.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| {
            error!("Failed to create storage dir {}: {}", base_path.display(), e);
            StorageError::ConnectionFailed(e.to_string())
        })?;
        info!("FileStorage initialized at {}", base_path.display());
        Ok(Self { base_path })
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", key, DOCUMENT_EXTENSION))
    }

    fn collect_keys(dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<(), StorageError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            error!("Failed to read dir {}: {}", dir.display(), e);
            StorageError::ReadFailed(e.to_string())
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                error!("Dir entry error: {}", e);
                StorageError::ReadFailed(e.to_string())
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.is_dir() {
                Self::collect_keys(&path, &format!("{}/{}", prefix, name), keys)?;
            } else if path.extension().and_then(|s| s.to_str()) == Some(DOCUMENT_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(format!("{}/{}", prefix, stem));
                }
            }
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Value, StorageError> {
        validate_key(key)?;
        let path = self.document_path(key);
        let mut content = String::new();
        match File::open(&path) {
            Ok(mut f) => f.read_to_string(&mut content).map_err(|e| {
                error!("Failed to read {}: {}", path.display(), e);
                StorageError::ReadFailed(e.to_string())
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => {
                error!("Failed to open {}: {}", path.display(), e);
                return Err(StorageError::ReadFailed(e.to_string()));
            }
        };
        let value = serde_json::from_str(&content).map_err(|e| {
            error!("Invalid JSON in {}: {}", path.display(), e);
            StorageError::ReadFailed(e.to_string())
        })?;
        debug!("Loaded {} from {}", key, path.display());
        Ok(value)
    }

    fn save(&self, key: &str, fields: &Fields) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.document_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create dir {}: {}", parent.display(), e);
                StorageError::WriteFailed(e.to_string())
            })?;
        }
        let body = serde_json::to_vec(fields).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        // write-then-rename keeps readers from seeing a half-written document
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp).map_err(|e| {
            error!("Failed to create {}: {}", tmp.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        f.write_all(&body).map_err(|e| {
            error!("Failed to write {}: {}", tmp.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            error!("Failed to move {} into place: {}", path.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        info!("Saved {} to {}", key, path.display());
        Ok(())
    }

    fn has_key(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.document_path(key).is_file()
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_key(prefix)?;
        let dir = self.base_path.join(prefix);
        let mut keys = Vec::new();
        if dir.is_dir() {
            Self::collect_keys(&dir, prefix, &mut keys)?;
        }
        keys.sort();
        debug!("Listed {} key(s) under {}", keys.len(), prefix);
        Ok(keys)
    }
}

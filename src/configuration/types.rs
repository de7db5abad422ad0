use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which `Storage` implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON document per key under `data_dir`
    #[default]
    File,
    /// SQLite file under `data_dir`
    Database,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "database" | "db" | "sqlite" => Ok(StorageBackend::Database),
            other => Err(format!("unknown storage backend `{}`", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Database => write!(f, "database"),
        }
    }
}

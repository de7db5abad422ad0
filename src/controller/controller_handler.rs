use std::sync::Arc;

use log::{error, info};

use crate::configuration::{Config, StorageBackend};
use crate::error_handling::types::*;
use crate::session_management::SubmissionResolver;
use crate::storage::{DatabaseStorage, FileStorage, Storage};
use crate::web_interface::{AppState, WebServer};

/// Owns the configuration and the opened storage backend, and runs the
/// web server on top of them.
pub struct Controller {
    pub config: Config,
    storage: Arc<dyn Storage>,
}

impl Controller {
    /// Opens the configured backend.
    ///
    /// The database backend drives its own runtime, so this must be called
    /// outside of any async context.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Opening {} storage under {}", config.backend, config.data_dir.display());
        let storage = open_storage(&config).map_err(|err| {
            error!("Unable to open storage: {}", err);
            ControllerError::Storage(err)
        })?;
        Ok(Self { config, storage })
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    pub async fn run(&self) -> Result<(), ControllerError> {
        let addr = self.config.socket_addr()?;
        let state = AppState::new(
            SubmissionResolver::new(self.storage.clone()),
            self.config.default_worker.clone(),
        );
        WebServer::new(state, self.config.max_body_bytes)
            .start(addr)
            .await?;
        info!("Web server stopped");
        Ok(())
    }
}

fn open_storage(config: &Config) -> Result<Arc<dyn Storage>, StorageError> {
    Ok(match config.backend {
        StorageBackend::File => Arc::new(FileStorage::new(&config.data_dir)?),
        StorageBackend::Database => Arc::new(DatabaseStorage::new_file(config.database_path())?),
    })
}

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};

use super::routes::routes;
use super::types::AppState;
use crate::error_handling::types::WebError;

/// HTTP front of the annotation core
pub struct WebServer {
    state: Arc<AppState>,
    max_body_bytes: u64,
}

impl WebServer {
    pub fn new(state: AppState, max_body_bytes: u64) -> Self {
        Self {
            state: Arc::new(state),
            max_body_bytes,
        }
    }

    /// Serves until the process is stopped.
    pub async fn start(&self, addr: SocketAddr) -> Result<(), WebError> {
        // warp panics on a bind failure, so probe the address first
        let probe = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Unable to bind {}: {}", addr, e);
            WebError::Bind(e.to_string())
        })?;
        drop(probe);

        info!("Listening on http://{}", addr);
        warp::serve(routes(self.state.clone(), self.max_body_bytes))
            .run(addr)
            .await;
        Ok(())
    }
}

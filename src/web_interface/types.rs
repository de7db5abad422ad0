use serde::{Deserialize, Serialize};

use crate::export::ExportAggregator;
use crate::session_management::SubmissionResolver;

/// Everything a request handler needs, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub resolver: SubmissionResolver,
    pub aggregator: ExportAggregator,
    pub default_worker: String,
}

impl AppState {
    pub fn new(resolver: SubmissionResolver, default_worker: impl Into<String>) -> Self {
        let default_worker = default_worker.into();
        Self {
            aggregator: ExportAggregator::new(resolver.clone(), default_worker.clone()),
            resolver,
            default_worker,
        }
    }
}

/// `?project_name=` of the export route.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub project_name: String,
}

/// `?project_name=&task_index=` of the labeling page.
#[derive(Debug, Deserialize)]
pub struct LabelPageQuery {
    pub project_name: String,
    pub task_index: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

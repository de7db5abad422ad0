use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use log::{error, info};
use warp::http::{header, StatusCode};
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};

use super::types::{AppState, ExportQuery, HealthResponse, LabelPageQuery};
use crate::assignment::{decode_record, Assignment};
use crate::error_handling::types::{SessionError, StorageError};
use crate::export::to_pretty_json;
use crate::session_management::record_timestamp;
use crate::session_state::Session;
use crate::storage::types::index_to_str;

/// All routes of the annotation server.
pub fn routes(
    state: Arc<AppState>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    load_assignment_route(state.clone(), max_body_bytes)
        .or(save_route(state.clone(), max_body_bytes))
        .unify()
        .or(export_route(state.clone()))
        .unify()
        .or(label_page_route(state))
        .unify()
        .or(health_route())
        .unify()
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// POST /postLoadAssignmentV2
pub fn load_assignment_route(
    state: Arc<AppState>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("postLoadAssignmentV2")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_body_bytes))
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(|body: Bytes, state: Arc<AppState>| load_assignment(state, body))
}

/// POST /postSaveV2
pub fn save_route(
    state: Arc<AppState>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("postSaveV2")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_body_bytes))
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(|body: Bytes, state: Arc<AppState>| save_session(state, body))
}

/// GET|POST /postExportV2?project_name=
pub fn export_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("postExportV2")
        .and(warp::path::end())
        .and(warp::get().or(warp::post()).unify())
        .and(warp::query::<ExportQuery>())
        .and(with_state(state))
        .and_then(|query: ExportQuery, state: Arc<AppState>| export_project(state, query))
}

/// GET /label2dv2?project_name=&task_index=
pub fn label_page_route(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("label2dv2")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<LabelPageQuery>())
        .and(with_state(state))
        .and_then(|query: LabelPageQuery, state: Arc<AppState>| label_page(state, query))
}

/// GET /health
pub fn health_route() -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("health").and(warp::path::end()).and(warp::get()).map(|| {
        reply::json(&HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        })
        .into_response()
    })
}

/// Runs a storage-bound job off the async workers.
async fn run_blocking<T, F>(job: F) -> Result<T, SessionError>
where
    F: FnOnce() -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await.unwrap_or_else(|e| {
        Err(SessionError::StorageUnavailable(StorageError::ConnectionFailed(
            e.to_string(),
        )))
    })
}

/// Empty-bodied failure response. Every failure is logged here.
fn error_response(err: &SessionError) -> Response {
    error!("{}", err);
    let status = match err {
        SessionError::DemoModeSaveRejected => StatusCode::FORBIDDEN,
        SessionError::MalformedKey { .. } | SessionError::Decode(_) => StatusCode::BAD_REQUEST,
        SessionError::StorageUnavailable(StorageError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
        SessionError::StorageUnavailable(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
        SessionError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reply::with_status(warp::reply(), status).into_response()
}

fn respond<T, F>(result: Result<T, SessionError>, ok: F) -> Result<Response, Infallible>
where
    F: FnOnce(T) -> Response,
{
    Ok(match result {
        Ok(value) => ok(value),
        Err(e) => error_response(&e),
    })
}

pub async fn load_assignment(state: Arc<AppState>, body: Bytes) -> Result<Response, Infallible> {
    let now = record_timestamp();
    let result = run_blocking(move || {
        let assignment: Assignment = decode_record(serde_json::from_slice(&body)?)?;
        state.resolver.load_for_labeling(
            assignment.project_name(),
            assignment.task.index,
            &state.default_worker,
            now,
        )
    })
    .await;
    respond(result, |session| reply::json(&session).into_response())
}

pub async fn save_session(state: Arc<AppState>, body: Bytes) -> Result<Response, Infallible> {
    let result = run_blocking(move || {
        let session = Session::from_json(&body)?;
        state.resolver.save(session)
    })
    .await;
    respond(result, |key| {
        info!("Stored {}", key);
        warp::reply().into_response()
    })
}

pub async fn export_project(
    state: Arc<AppState>,
    query: ExportQuery,
) -> Result<Response, Infallible> {
    let project = query.project_name;
    let disposition = format!("attachment; filename={}_results.json", project);
    let result = run_blocking(move || to_pretty_json(&state.aggregator.export(&project)?)).await;
    respond(result, |body| {
        let mut response = reply::with_header(body, header::CONTENT_DISPOSITION, disposition)
            .into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        response
    })
}

/// The assignment the labeling page is rendered from, created on first visit.
pub async fn label_page(
    state: Arc<AppState>,
    query: LabelPageQuery,
) -> Result<Response, Infallible> {
    let now = record_timestamp();
    let result = run_blocking(move || {
        state.resolver.assignments().load_or_create_assignment(
            &query.project_name,
            &index_to_str(query.task_index),
            &state.default_worker,
            now,
        )
    })
    .await;
    respond(result, |assignment| reply::json(&assignment).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_management::{SubmissionResolver, DEFAULT_WORKER};
    use crate::storage::types::task_key;
    use crate::storage::{FileStorage, Storage};
    use serde_json::json;
    use tempfile::TempDir;

    fn state(dir: &TempDir, demo: bool) -> Arc<AppState> {
        let storage = FileStorage::new(dir.path()).unwrap();
        let task = json!({
            "index": 3,
            "projectOptions": {"name": "proj", "itemType": "image", "demoMode": demo},
            "items": [{"index": 0, "url": "a.jpg"}]
        });
        storage
            .save(&task_key("proj", "000003"), task.as_object().unwrap())
            .unwrap();
        Arc::new(AppState::new(
            SubmissionResolver::new(Arc::new(storage)),
            DEFAULT_WORKER,
        ))
    }

    fn load_body() -> Bytes {
        Bytes::from(json!({"task": {"index": 3, "projectOptions": {"name": "proj"}}}).to_string())
    }

    #[tokio::test]
    async fn test_load_then_save() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);

        let loaded = load_assignment(state.clone(), load_body()).await.unwrap();
        assert_eq!(loaded.status(), StatusCode::OK);
        assert!(state.resolver.assignments().has_assignment("proj", "000003", DEFAULT_WORKER));

        let session = state.resolver.resolve("proj", "000003", DEFAULT_WORKER).unwrap();
        let body = Bytes::from(serde_json::to_vec(&session).unwrap());
        let saved = save_session(state.clone(), body).await.unwrap();
        assert_eq!(saved.status(), StatusCode::OK);
        assert!(state
            .resolver
            .latest_submission_key("proj", "000003", DEFAULT_WORKER)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_demo_save_is_forbidden() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true);
        load_assignment(state.clone(), load_body()).await.unwrap();
        let session = state.resolver.resolve("proj", "000003", DEFAULT_WORKER).unwrap();

        let body = Bytes::from(serde_json::to_vec(&session).unwrap());
        let response = save_session(state.clone(), body).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state
            .resolver
            .latest_submission_key("proj", "000003", DEFAULT_WORKER)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_bad_bodies_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        let response = save_session(state.clone(), Bytes::from_static(b"{oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let malformed = Bytes::from_static(br#"{"labels": {"x": {}}}"#);
        let response = save_session(state, malformed).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_is_an_attachment() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        let query = ExportQuery { project_name: "proj".into() };
        let response = export_project(state, query).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=proj_results.json"
        );
    }

    #[tokio::test]
    async fn test_label_page_creates_assignment_once() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        let query = || LabelPageQuery { project_name: "proj".into(), task_index: 3 };

        assert_eq!(label_page(state.clone(), query()).await.unwrap().status(), StatusCode::OK);
        let first = state.resolver.assignments().load_assignment("proj", "000003", DEFAULT_WORKER).unwrap();
        label_page(state.clone(), query()).await.unwrap();
        let second = state.resolver.assignments().load_assignment("proj", "000003", DEFAULT_WORKER).unwrap();
        assert_eq!(first.id, second.id);

        let missing = LabelPageQuery { project_name: "proj".into(), task_index: 9 };
        assert_eq!(label_page(state, missing).await.unwrap().status(), StatusCode::NOT_FOUND);
    }
}

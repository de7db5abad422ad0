//! Shared storage types and the key namespace.
//!
//! Every document lives under a `/`-joined key whose first segment is the
//! project name:
//! - `project/project`: the project record
//! - `project/tasks/<task>`: one record per task
//! - `project/assignments/<task>/<worker>`: one assignment per (task, worker)
//! - `project/submissions/<task>/<worker>/<submitTime>`: one immutable session per save

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error_handling::types::StorageError;

/// Insertion-ordered field set handed to `Storage::save`.
pub type Fields = Map<String, Value>;

pub const SUBMISSIONS_DIR: &str = "submissions";
pub const ASSIGNMENTS_DIR: &str = "assignments";
pub const TASKS_DIR: &str = "tasks";
pub const PROJECT_RECORD: &str = "project";

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("static key segment pattern"))
}

/// Returns whether `segment` can appear between two `/` in a key.
pub fn is_valid_segment(segment: &str) -> bool {
    segment != "." && segment != ".." && segment_pattern().is_match(segment)
}

/// Checks that every segment of `key` is a valid segment.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || !key.split('/').all(is_valid_segment) {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub fn join_key(segments: &[&str]) -> String {
    segments.join("/")
}

/// Formats a task index the way it appears in keys: six zero-padded digits.
pub fn index_to_str(index: i64) -> String {
    format!("{:06}", index)
}

/// Last segment of a key.
pub fn key_suffix(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

pub fn project_key(project: &str) -> String {
    join_key(&[project, PROJECT_RECORD])
}

pub fn tasks_prefix(project: &str) -> String {
    join_key(&[project, TASKS_DIR])
}

pub fn task_key(project: &str, task_id: &str) -> String {
    join_key(&[project, TASKS_DIR, task_id])
}

pub fn assignment_key(project: &str, task_id: &str, worker_id: &str) -> String {
    join_key(&[project, ASSIGNMENTS_DIR, task_id, worker_id])
}

pub fn submission_prefix(project: &str, task_id: &str, worker_id: &str) -> String {
    join_key(&[project, SUBMISSIONS_DIR, task_id, worker_id])
}

pub fn submission_key(project: &str, task_id: &str, worker_id: &str, submit_time: i64) -> String {
    join_key(&[
        project,
        SUBMISSIONS_DIR,
        task_id,
        worker_id,
        &submit_time.to_string(),
    ])
}

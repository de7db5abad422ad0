use std::cmp::Ordering;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::record_timestamp;
use crate::assignment::{assignment_to_session, AssignmentStore};
use crate::error_handling::types::SessionError;
use crate::session_state::Session;
use crate::storage::types::{index_to_str, key_suffix, submission_prefix};
use crate::storage::Storage;

/// Picks the most recent submission among `keys`.
///
/// Keys end in their submit time. Numeric suffixes compare as numbers, so a
/// timestamp that gains a digit still sorts after the shorter ones; keys
/// with a non-numeric suffix fall back to plain string order.
pub fn select_latest(keys: &[String]) -> Option<&String> {
    keys.iter().max_by(|a, b| compare_submission_keys(a, b))
}

fn compare_submission_keys(a: &str, b: &str) -> Ordering {
    match (key_suffix(a).parse::<i64>(), key_suffix(b).parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

/// Finds the current session of a (project, task, worker) triple and
/// persists new versions of it.
///
/// # Fields Overview
/// - `storage`: the key-value backend holding submissions
/// - `assignments`: record access used when nothing was submitted yet
#[derive(Clone)]
pub struct SubmissionResolver {
    storage: Arc<dyn Storage>,
    assignments: AssignmentStore,
}

impl SubmissionResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            assignments: AssignmentStore::new(storage.clone()),
            storage,
        }
    }

    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    pub fn latest_submission_key(
        &self,
        project: &str,
        task_id: &str,
        worker_id: &str,
    ) -> Result<Option<String>, SessionError> {
        let keys = self
            .storage
            .list_keys(&submission_prefix(project, task_id, worker_id))?;
        Ok(select_latest(&keys).cloned())
    }

    /// Loads the latest submission, or bootstraps a session from the stored
    /// assignment when there is none.
    ///
    /// Never creates an assignment: a triple with neither submissions nor an
    /// assignment fails with `StorageUnavailable(NotFound)`.
    pub fn resolve(
        &self,
        project: &str,
        task_id: &str,
        worker_id: &str,
    ) -> Result<Session, SessionError> {
        if let Some(key) = self.latest_submission_key(project, task_id, worker_id)? {
            info!("Reading {}", key);
            return Session::from_value(self.storage.load(&key)?);
        }
        let assignment = self.assignments.load_assignment(project, task_id, worker_id)?;
        Ok(assignment_to_session(&assignment))
    }

    /// Persists `session` as a new version stamped with the current time.
    pub fn save(&self, session: Session) -> Result<String, SessionError> {
        self.save_at(session, record_timestamp())
    }

    /// Persists `session` as a new version stamped with `submit_time`.
    ///
    /// Demo sessions are rejected before anything is written.
    pub fn save_at(&self, mut session: Session, submit_time: i64) -> Result<String, SessionError> {
        if session.is_demo() {
            error!(
                "Refusing to save demo session for {}/{}",
                session.config.project_name, session.config.task_id
            );
            return Err(SessionError::DemoModeSaveRejected);
        }
        session.config.submit_time = submit_time;
        let key = session.storage_key();
        if self.storage.has_key(&key) {
            warn!("Submission {} already exists and will be replaced", key);
        }
        self.storage.save(&key, &session.persistable_fields()?)?;
        debug!("Saved submission {}", key);
        Ok(key)
    }

    /// Session for the labeling page of `task_index`, as seen by `worker_id`.
    ///
    /// Creates the assignment on first visit. `start_time` is stamped with
    /// `now` only if no earlier load has set it.
    pub fn load_for_labeling(
        &self,
        project: &str,
        task_index: i64,
        worker_id: &str,
        now: i64,
    ) -> Result<Session, SessionError> {
        let task_id = index_to_str(task_index);
        let mut session = if self.assignments.has_assignment(project, &task_id, worker_id) {
            self.resolve(project, &task_id, worker_id)?
        } else {
            let assignment = self
                .assignments
                .create_assignment(project, &task_id, worker_id, now)?;
            assignment_to_session(&assignment)
        };
        if session.config.start_time == 0 {
            session.config.start_time = now;
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn latest_is_greatest_timestamp() {
        let k = keys(&["p/submissions/000000/w/100", "p/submissions/000000/w/200"]);
        assert_eq!(select_latest(&k).unwrap(), "p/submissions/000000/w/200");
    }

    #[test]
    fn numeric_order_beats_string_order() {
        let k = keys(&["p/submissions/000000/w/999", "p/submissions/000000/w/1000"]);
        assert_eq!(select_latest(&k).unwrap(), "p/submissions/000000/w/1000");
    }

    #[test]
    fn non_numeric_suffix_falls_back_to_string_order() {
        let k = keys(&["p/submissions/000000/w/b", "p/submissions/000000/w/a"]);
        assert_eq!(select_latest(&k).unwrap(), "p/submissions/000000/w/b");
        assert!(select_latest(&[]).is_none());
    }
}

use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use super::types::{decode_record, Assignment, Project, Task};
use crate::error_handling::types::SessionError;
use crate::storage::types::{assignment_key, project_key, task_key, tasks_prefix};
use crate::storage::Storage;

/// Read access to project, task and assignment records, plus the one write
/// path that creates a missing assignment.
#[derive(Clone)]
pub struct AssignmentStore {
    storage: Arc<dyn Storage>,
}

impl AssignmentStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn has_assignment(&self, project: &str, task_id: &str, worker_id: &str) -> bool {
        self.storage.has_key(&assignment_key(project, task_id, worker_id))
    }

    pub fn load_assignment(
        &self,
        project: &str,
        task_id: &str,
        worker_id: &str,
    ) -> Result<Assignment, SessionError> {
        let key = assignment_key(project, task_id, worker_id);
        info!("Reading {}", key);
        decode_record(self.storage.load(&key)?)
    }

    pub fn load_task(&self, project: &str, task_id: &str) -> Result<Task, SessionError> {
        decode_record(self.storage.load(&task_key(project, task_id))?)
    }

    /// Every task of `project`, ordered by task index.
    pub fn list_tasks(&self, project: &str) -> Result<Vec<Task>, SessionError> {
        let mut tasks = Vec::new();
        for key in self.storage.list_keys(&tasks_prefix(project))? {
            tasks.push(decode_record::<Task>(self.storage.load(&key)?)?);
        }
        tasks.sort_by_key(|t| t.index);
        debug!("Found {} task(s) in {}", tasks.len(), project);
        Ok(tasks)
    }

    pub fn load_project(&self, project: &str) -> Result<Project, SessionError> {
        decode_record(self.storage.load(&project_key(project))?)
    }

    /// Creates and persists a fresh assignment of `task_id` to `worker_id`.
    ///
    /// Overwrites any assignment already stored for the pair, so callers check
    /// `has_assignment` first unless a reset is intended.
    pub fn create_assignment(
        &self,
        project: &str,
        task_id: &str,
        worker_id: &str,
        start_time: i64,
    ) -> Result<Assignment, SessionError> {
        let task = self.load_task(project, task_id)?;
        let assignment = Assignment {
            id: Uuid::new_v4().to_string(),
            task,
            worker_id: worker_id.to_string(),
            start_time,
            ..Default::default()
        };
        let key = assignment_key(project, task_id, worker_id);
        self.storage.save(&key, &assignment.persistable_fields()?)?;
        info!("Created assignment {} at {}", assignment.id, key);
        Ok(assignment)
    }

    pub fn load_or_create_assignment(
        &self,
        project: &str,
        task_id: &str,
        worker_id: &str,
        now: i64,
    ) -> Result<Assignment, SessionError> {
        if self.has_assignment(project, task_id, worker_id) {
            self.load_assignment(project, task_id, worker_id)
        } else {
            self.create_assignment(project, task_id, worker_id, now)
        }
    }
}

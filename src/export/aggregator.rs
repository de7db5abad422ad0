use std::collections::BTreeMap;

use log::{debug, info, warn};

use super::types::ItemExport;
use crate::assignment::{Project, Task};
use crate::error_handling::types::SessionError;
use crate::session_management::SubmissionResolver;
use crate::session_state::{Attribute, Label, Session};
use crate::storage::types::index_to_str;

/// Joins every task's latest session into flat per-item records.
///
/// # Fields Overview
/// - `resolver`: used once per task to find the current session
/// - `worker_id`: the single worker whose submissions are exported
#[derive(Clone)]
pub struct ExportAggregator {
    resolver: SubmissionResolver,
    worker_id: String,
}

impl ExportAggregator {
    pub fn new(resolver: SubmissionResolver, worker_id: impl Into<String>) -> Self {
        Self {
            resolver,
            worker_id: worker_id.into(),
        }
    }

    /// Exports every task of `project`, in task order.
    ///
    /// A task whose session cannot be resolved degrades to bare records
    /// built from its own item list. Only a failure to list the tasks
    /// aborts the export.
    pub fn export(&self, project: &str) -> Result<Vec<ItemExport>, SessionError> {
        let project_record = self
            .resolver
            .assignments()
            .load_project(project)
            .unwrap_or_else(|e| {
                warn!("Could not load project record of {}: {}", project, e);
                Project::default()
            });
        let tasks = self.resolver.assignments().list_tasks(project)?;

        let mut items = Vec::new();
        for task in &tasks {
            let video_name = video_name(&project_record, task);
            match self.resolver.resolve(project, &task.task_id(), &self.worker_id) {
                Ok(session) => items.extend(session_records(&session, video_name)),
                Err(e) => {
                    info!("Exporting task {} of {} without labels: {}", task.task_id(), project, e);
                    items.extend(
                        task.items
                            .iter()
                            .map(|item| ItemExport::new(item.index, &item.url, video_name.clone())),
                    );
                }
            }
        }
        debug!("Exported {} item(s) from {} task(s) of {}", items.len(), tasks.len(), project);
        Ok(items)
    }
}

fn video_name(project: &Project, task: &Task) -> Option<String> {
    project
        .options
        .is_video()
        .then(|| format!("{}_{}", project.options.name, index_to_str(task.index)))
}

fn session_records(session: &Session, video_name: Option<String>) -> Vec<ItemExport> {
    session
        .items
        .iter()
        .map(|item| {
            let mut record = ItemExport::new(item.index, &item.url, video_name.clone());
            if let Some(label) = session.item_label(item) {
                record.attributes = label_attributes(label, &session.config.attributes);
            }
            record
        })
        .collect()
}

/// Human-readable value of each of the label's attributes.
///
/// The first definition with a matching name wins. Names without a
/// definition, and indices outside the definition's value list, are skipped.
pub fn label_attributes(label: &Label, definitions: &[Attribute]) -> BTreeMap<String, String> {
    let mut resolved = BTreeMap::new();
    for name in label.attributes.keys() {
        let Some(definition) = definitions.iter().find(|d| &d.name == name) else {
            continue;
        };
        let value = label
            .first_attribute_value(name)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| definition.values.get(index));
        if let Some(value) = value {
            resolved.insert(name.clone(), value.clone());
        }
    }
    resolved
}

//! Records owned by project/task management and read by the annotation core.
//!
//! Every field defaults, so documents written by older tooling still load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error_handling::types::SessionError;
use crate::session_state::session::null_as_default;
use crate::session_state::Attribute;
use crate::storage::types::{assignment_key, index_to_str, Fields};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subcategories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectOptions {
    pub name: String,
    pub item_type: String,
    pub label_type: String,
    pub task_size: i64,
    pub handler_url: String,
    pub page_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
    pub num_leaf_categories: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
    pub instructions: String,
    pub demo_mode: bool,
    pub bundle_file: String,
    pub vendor_id: i64,
}

impl ProjectOptions {
    pub fn is_video(&self) -> bool {
        self.item_type == "video"
    }

    /// Names of the top-level categories, in configured order.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

/// One media item as listed by a task or project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskItem {
    pub url: String,
    pub index: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub label_ids: Vec<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub project_options: ProjectOptions,
    pub index: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<TaskItem>,
}

impl Task {
    pub fn task_id(&self) -> String {
        index_to_str(self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<TaskItem>,
    pub options: ProjectOptions,
}

/// Binding of one task to one worker, created at most once per pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assignment {
    pub id: String,
    pub task: Task,
    pub worker_id: String,
    pub start_time: i64,
    pub submit_time: i64,
    pub num_labeled_items: i64,
    pub user_agent: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ip_info: Map<String, Value>,
}

impl Assignment {
    pub fn project_name(&self) -> &str {
        &self.task.project_options.name
    }

    pub fn storage_key(&self) -> String {
        assignment_key(self.project_name(), &self.task.task_id(), &self.worker_id)
    }

    pub fn persistable_fields(&self) -> Result<Fields, SessionError> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(SessionError::Decode("assignment did not encode to an object".into())),
        }
    }
}

/// Decodes a stored record, treating `null` as an empty record.
pub fn decode_record<T: serde::de::DeserializeOwned + Default>(value: Value) -> Result<T, SessionError> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}

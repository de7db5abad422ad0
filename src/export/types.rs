use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error_handling::types::SessionError;

/// Timestamp written into every record until items carry a real capture time.
pub const PLACEHOLDER_TIMESTAMP: i64 = 10000;

/// One exported item.
///
/// `video_name` is only set for video projects, as `<project>_<task id>`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemExport {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub video_name: String,
    pub attributes: BTreeMap<String, String>,
    pub timestamp: i64,
    pub index: i64,
}

impl ItemExport {
    pub fn new(index: i64, url: &str, video_name: Option<String>) -> Self {
        Self {
            name: url.to_string(),
            url: url.to_string(),
            video_name: video_name.unwrap_or_default(),
            attributes: BTreeMap::new(),
            timestamp: PLACEHOLDER_TIMESTAMP,
            index,
        }
    }
}

/// Indented JSON array, the body of the export attachment.
pub fn to_pretty_json(items: &[ItemExport]) -> Result<String, SessionError> {
    Ok(serde_json::to_string_pretty(items)?)
}

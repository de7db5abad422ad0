use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::id_map::{type_name, IdMap, ObjectId};
use super::label::Label;
use super::shape::Shape;
use crate::error_handling::types::SessionError;
use crate::storage::types::{submission_key, Fields};

/// Reads `null` as the field's default, the same as a missing field.
///
/// Clients encode empty lists as `null`, so every list field of the
/// session schema goes through this.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Names of the persisted top-level fields, in storage order.
pub const PERSISTED_FIELDS: [&str; 7] = [
    "config", "current", "items", "labels", "tracks", "shapes", "actions",
];

/// An attribute definition: a name plus the human-readable values its
/// indices refer to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attribute {
    pub name: String,
    pub tool_type: String,
    pub tag_text: String,
    pub tag_prefix: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tag_suffixes: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub values: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub button_colors: Vec<String>,
}

/// Per-submission metadata.
///
/// `submit_time` is stamped by every save, `start_time` by the first load;
/// both are Unix millis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub assignment_id: String,
    pub project_name: String,
    pub item_type: String,
    pub label_type: String,
    pub task_size: i64,
    pub handler_url: String,
    pub page_title: String,
    pub instruction_page: String,
    pub demo_mode: bool,
    pub bundle_file: String,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
    pub task_id: String,
    pub worker_id: String,
    pub start_time: i64,
    pub submit_time: i64,
}

/// The in-progress selection; `-1` everywhere means nothing selected yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionCursor {
    pub item: i64,
    pub label: ObjectId,
    /// Highest object id handed out so far.
    pub max_object_id: ObjectId,
}

impl Default for SessionCursor {
    fn default() -> Self {
        Self {
            item: -1,
            label: -1,
            max_object_id: -1,
        }
    }
}

impl SessionCursor {
    /// Next id that cannot collide with any allocated one.
    pub fn next_object_id(&self) -> ObjectId {
        self.max_object_id + 1
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub id: i64,
    pub index: i64,
    pub url: String,
    pub active: bool,
    pub loaded: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Vec<ObjectId>,
}

/// One worker's annotation pass over one task.
///
/// Stored versions are never modified: every save writes a new document
/// under a key ending in its submit time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    pub config: SessionConfig,
    pub current: SessionCursor,
    pub items: Vec<Item>,
    pub labels: IdMap<Label>,
    pub tracks: IdMap<Vec<Label>>,
    pub shapes: IdMap<Shape>,
    pub actions: Vec<Value>,
}

impl Session {
    /// Versioned key `project/submissions/task/worker/submitTime`.
    pub fn storage_key(&self) -> String {
        submission_key(
            &self.config.project_name,
            &self.config.task_id,
            &self.config.worker_id,
            self.config.submit_time,
        )
    }

    /// The seven persisted fields, so storage can treat a session as a plain
    /// property bag.
    pub fn persistable_fields(&self) -> Result<Fields, SessionError> {
        let mut fields = Map::new();
        fields.insert(PERSISTED_FIELDS[0].into(), serde_json::to_value(&self.config)?);
        fields.insert(PERSISTED_FIELDS[1].into(), serde_json::to_value(self.current)?);
        fields.insert(PERSISTED_FIELDS[2].into(), serde_json::to_value(&self.items)?);
        fields.insert(PERSISTED_FIELDS[3].into(), serde_json::to_value(&self.labels)?);
        fields.insert(PERSISTED_FIELDS[4].into(), serde_json::to_value(&self.tracks)?);
        fields.insert(PERSISTED_FIELDS[5].into(), serde_json::to_value(&self.shapes)?);
        fields.insert(PERSISTED_FIELDS[6].into(), Value::Array(self.actions.clone()));
        Ok(fields)
    }

    pub fn is_demo(&self) -> bool {
        self.config.demo_mode
    }

    pub fn item_label(&self, item: &Item) -> Option<&Label> {
        item.labels.first().and_then(|id| self.labels.get(id))
    }

    /// Decodes a session document.
    ///
    /// Missing or `null` fields take their defaults. The integer-keyed maps
    /// fail with `MalformedKey` on a bad key; everything else that does not
    /// fit its schema fails with `Decode`.
    pub fn from_value(value: Value) -> Result<Self, SessionError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(SessionError::Decode(format!(
                    "session must be an object, found {}",
                    type_name(&other)
                )))
            }
        };
        Ok(Session {
            config: take_field(&mut fields, "config")?,
            current: take_field(&mut fields, "current")?,
            items: take_field(&mut fields, "items")?,
            labels: IdMap::from_value(fields.remove("labels").unwrap_or(Value::Null))?,
            tracks: IdMap::from_value(fields.remove("tracks").unwrap_or(Value::Null))?,
            shapes: IdMap::from_value(fields.remove("shapes").unwrap_or(Value::Null))?,
            actions: take_field(&mut fields, "actions")?,
        })
    }

    pub fn from_json(body: &[u8]) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }
}

fn take_field<T: DeserializeOwned + Default>(
    fields: &mut Map<String, Value>,
    name: &str,
) -> Result<T, SessionError> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| SessionError::Decode(format!("field `{}`: {}", name, e))),
    }
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Session::from_value(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "config": {
                "assignmentId": "a-1", "projectName": "proj", "itemType": "image",
                "labelType": "box2d", "taskSize": 2, "handlerUrl": "label2dv2",
                "pageTitle": "Boxes", "instructionPage": "", "demoMode": false,
                "bundleFile": "image.js", "categories": ["car", "person"],
                "attributes": [{"name": "occluded", "toolType": "switch", "tagText": "o",
                                "tagPrefix": "", "tagSuffixes": [], "values": ["no", "yes"],
                                "buttonColors": []}],
                "taskId": "000003", "workerId": "default_worker",
                "startTime": 1000, "submitTime": 2000
            },
            "current": {"item": 0, "label": 5, "maxObjectId": 6},
            "items": [{"id": 0, "index": 0, "url": "a.jpg", "active": true, "loaded": true, "labels": [5]}],
            "labels": {"5": {"id": 5, "item": 0, "category": [0], "attributes": {"occluded": [1]},
                             "parent": -1, "children": [], "numChildren": 0, "valid": true,
                             "shapes": [6], "selectedShape": 6, "state": 0}},
            "tracks": {"3": [{"id": 5, "item": 0, "category": [0], "attributes": {},
                              "parent": -1, "children": [], "numChildren": 0, "valid": true,
                              "shapes": [6], "selectedShape": 6, "state": 0}]},
            "shapes": {"6": {"x1": 1, "y1": 2, "x2": 3, "y2": 4}},
            "actions": [{"type": "ADD_LABEL", "labelId": 5}]
        })
    }

    #[test]
    fn storage_key_is_versioned_by_submit_time() {
        let session = Session::from_value(sample()).unwrap();
        assert_eq!(
            session.storage_key(),
            "proj/submissions/000003/default_worker/2000"
        );
    }

    #[test]
    fn persistable_fields_are_the_seven_fields_in_order() {
        let session = Session::from_value(sample()).unwrap();
        let fields = session.persistable_fields().unwrap();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, PERSISTED_FIELDS.to_vec());
    }

    #[test]
    fn round_trip_preserves_document() {
        let session = Session::from_value(sample()).unwrap();
        let encoded = Value::Object(session.persistable_fields().unwrap());
        assert_eq!(encoded, sample());
        assert_eq!(Session::from_value(encoded).unwrap(), session);
    }

    #[test]
    fn round_trip_keeps_tracks() {
        let session = Session::from_value(sample()).unwrap();
        assert_eq!(session.tracks[&3].len(), 1);
        assert_eq!(session.tracks[&3][0].shapes, vec![6]);
        let encoded = Value::Object(session.persistable_fields().unwrap());
        assert_eq!(encoded["tracks"], sample()["tracks"]);
    }

    #[test]
    fn sparse_label_is_stable_after_one_pass() {
        let mut doc = sample();
        doc["labels"] = json!({"8": {"id": 8, "shapes": [6]}});
        let first = Session::from_value(doc).unwrap();
        let encoded = Value::Object(first.persistable_fields().unwrap());
        assert_eq!(encoded["labels"]["8"]["id"], 8);
        assert_eq!(encoded["labels"]["8"]["parent"], -1);

        let second = Session::from_value(encoded).unwrap();
        assert_eq!(second, first);
        assert_eq!(second.labels[&8].shapes, vec![6]);
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let doc = json!({
            "config": {"projectName": "p", "categories": null, "attributes": null},
            "current": {"item": -1, "label": -1, "maxObjectId": -1},
            "items": [{"id": 0, "index": 0, "url": "a.jpg", "labels": null}],
            "labels": null, "tracks": null, "shapes": null, "actions": null
        });
        let session = Session::from_value(doc).unwrap();
        assert!(session.config.categories.is_empty());
        assert!(session.config.attributes.is_empty());
        assert!(session.items[0].labels.is_empty());
        assert_eq!(session.items[0].url, "a.jpg");

        let attribute: Attribute =
            serde_json::from_value(json!({"name": "occluded", "values": null, "tagSuffixes": null}))
                .unwrap();
        assert!(attribute.values.is_empty());
    }

    #[test]
    fn non_numeric_label_key_is_malformed() {
        let mut doc = sample();
        doc["labels"] = json!({"abc": {"id": 1}});
        assert!(matches!(
            Session::from_value(doc),
            Err(SessionError::MalformedKey { key }) if key == "abc"
        ));
    }

    #[test]
    fn missing_fields_default_and_cursor_starts_unselected() {
        let session = Session::from_value(json!({"config": {"projectName": "p"}})).unwrap();
        assert_eq!(session.current, SessionCursor::default());
        assert_eq!(session.current.next_object_id(), 0);
        assert!(session.items.is_empty() && session.labels.is_empty());
    }

    #[test]
    fn invalid_json_and_wrong_types_are_decode_errors() {
        assert!(matches!(Session::from_json(b"{oops"), Err(SessionError::Decode(_))));
        assert!(matches!(
            Session::from_value(json!({"items": "nope"})),
            Err(SessionError::Decode(_))
        ));
        assert!(matches!(Session::from_value(json!([])), Err(SessionError::Decode(_))));
    }

    #[test]
    fn item_label_follows_first_label_id() {
        let session = Session::from_value(sample()).unwrap();
        let label = session.item_label(&session.items[0]).unwrap();
        assert_eq!(label.shapes, vec![6]);
    }
}

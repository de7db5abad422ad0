use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id_map::{loose, loose_int, LenientDecode, ObjectId};

/// Sentinel stored in `parent` for a root label.
pub const NO_PARENT: ObjectId = -1;

/// One annotation instance attached to an item.
///
/// Parent/child links are plain ids into the session's label map; nothing
/// here owns or validates the other end of a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Label {
    pub id: ObjectId,
    pub item: i64,
    pub category: Vec<i64>,
    /// Attribute name to the indices of its selected values.
    pub attributes: BTreeMap<String, Vec<i64>>,
    pub parent: ObjectId,
    pub children: Vec<ObjectId>,
    pub num_children: i64,
    pub valid: bool,
    pub shapes: Vec<ObjectId>,
    pub selected_shape: ObjectId,
    pub state: i64,
}

/// Missing fields decode to these values. `parent` starts at `NO_PARENT`,
/// not zero, so an absent parent never points at label 0.
impl Default for Label {
    fn default() -> Self {
        Self {
            id: 0,
            item: 0,
            category: Vec::new(),
            attributes: BTreeMap::new(),
            parent: NO_PARENT,
            children: Vec::new(),
            num_children: 0,
            valid: false,
            shapes: Vec::new(),
            selected_shape: 0,
            state: 0,
        }
    }
}

impl Label {
    pub fn parent_id(&self) -> Option<ObjectId> {
        (self.parent >= 0).then_some(self.parent)
    }

    /// First selected value index for `attribute`, if any.
    pub fn first_attribute_value(&self, attribute: &str) -> Option<i64> {
        self.attributes.get(attribute).and_then(|v| v.first().copied())
    }

    /// Field-by-field mapping from an untyped object.
    ///
    /// Field names match case-insensitively, floats truncate to integers and
    /// a field of the wrong type is skipped rather than failing the label.
    fn map_fields(fields: &Map<String, Value>) -> Self {
        let by_name: HashMap<String, &Value> = fields
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let get = |name: &str| by_name.get(name).copied();
        let int = |name: &str| get(name).and_then(loose_int);
        let ints = |name: &str| get(name).and_then(int_list);

        let mut label = Label::default();
        if let Some(v) = int("id") {
            label.id = v;
        }
        if let Some(v) = int("item") {
            label.item = v;
        }
        if let Some(v) = ints("category") {
            label.category = v;
        }
        if let Some(Value::Object(attrs)) = get("attributes") {
            label.attributes = attrs
                .iter()
                .filter_map(|(name, v)| int_list(v).map(|ints| (name.clone(), ints)))
                .collect();
        }
        if let Some(v) = int("parent") {
            label.parent = v;
        }
        if let Some(v) = ints("children") {
            label.children = v;
        }
        if let Some(v) = int("numchildren") {
            label.num_children = v;
        }
        if let Some(v) = get("valid").and_then(loose::<bool>) {
            label.valid = v;
        }
        if let Some(v) = ints("shapes") {
            label.shapes = v;
        }
        if let Some(v) = int("selectedshape") {
            label.selected_shape = v;
        }
        if let Some(v) = int("state") {
            label.state = v;
        }
        label
    }
}

fn int_list(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(loose_int).collect()),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

impl LenientDecode for Label {
    fn decode_lenient(value: Value) -> Self {
        match value {
            Value::Object(fields) => Label::map_fields(&fields),
            _ => Label::default(),
        }
    }
}

/// A track is the ordered run of labels sharing one identity across items.
impl LenientDecode for Vec<Label> {
    fn decode_lenient(value: Value) -> Self {
        match value {
            Value::Array(items) => items.into_iter().map(Label::decode_lenient).collect(),
            _ => Vec::new(),
        }
    }
}

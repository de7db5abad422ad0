//! Integer-keyed maps whose values have no shared schema.
//!
//! On the wire these are JSON objects keyed by decimal strings
//! (`{"3": {...}, "12": {...}}`). Decoding parses every key as an object id
//! and hands each value to the value type's [`LenientDecode`] impl, so the
//! same container serves labels, tracks and opaque shapes.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::de::{self, DeserializeOwned};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error_handling::types::SessionError;

/// Identifier of a label, track or shape inside one session.
pub type ObjectId = i64;

/// Best-effort conversion from an untyped value.
///
/// Implementations never fail: whatever cannot be mapped is left at the
/// type's `Default` value so documents written by older clients still load.
pub trait LenientDecode: Sized {
    fn decode_lenient(value: Value) -> Self;
}

impl LenientDecode for Value {
    fn decode_lenient(value: Value) -> Self {
        value
    }
}

/// Parses a wire map key into an object id.
///
/// Only the canonical decimal form is accepted, so `"007"` or `"+7"` cannot
/// collide with `"7"` and overwrite it.
pub fn parse_object_id(key: &str) -> Result<ObjectId, SessionError> {
    match key.parse::<ObjectId>() {
        Ok(id) if id >= 0 && id.to_string() == key => Ok(id),
        _ => Err(SessionError::MalformedKey {
            key: key.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdMap<V>(BTreeMap<ObjectId, V>);

impl<V> IdMap<V> {
    pub fn new() -> Self {
        IdMap(BTreeMap::new())
    }

    pub fn into_inner(self) -> BTreeMap<ObjectId, V> {
        self.0
    }
}

impl<V> Default for IdMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Deref for IdMap<V> {
    type Target = BTreeMap<ObjectId, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<V> DerefMut for IdMap<V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<V> FromIterator<(ObjectId, V)> for IdMap<V> {
    fn from_iter<I: IntoIterator<Item = (ObjectId, V)>>(iter: I) -> Self {
        IdMap(iter.into_iter().collect())
    }
}

impl<V: LenientDecode> IdMap<V> {
    /// Decodes a wire object into an id map.
    ///
    /// `null` decodes to an empty map. Any key that is not a non-negative
    /// integer fails the whole decode; nested values never do.
    pub fn from_value(value: Value) -> Result<Self, SessionError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(fields) => Self::from_fields(fields),
            other => Err(SessionError::Decode(format!(
                "expected an object keyed by ids, found {}",
                type_name(&other)
            ))),
        }
    }

    fn from_fields(fields: Map<String, Value>) -> Result<Self, SessionError> {
        let mut map = BTreeMap::new();
        for (key, value) in fields {
            let id = parse_object_id(&key)?;
            map.insert(id, V::decode_lenient(value));
        }
        Ok(IdMap(map))
    }
}

impl<V: Serialize> Serialize for IdMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, value) in &self.0 {
            map.serialize_entry(&id.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de, V: LenientDecode> Deserialize<'de> for IdMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        IdMap::from_value(value).map_err(de::Error::custom)
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads an integer the way a loose field mapper would: floats are truncated.
pub(crate) fn loose_int(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// Deserializes `value` as `T`, returning `None` instead of an error.
pub(crate) fn loose<T: DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_integer_keys() {
        let map: IdMap<Value> = IdMap::from_value(json!({"0": 1, "12": {"x": 2}})).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&12], json!({"x": 2}));
    }

    #[test]
    fn non_numeric_key_fails_the_decode() {
        let err = IdMap::<Value>::from_value(json!({"1": {}, "abc": {}})).unwrap_err();
        match err {
            SessionError::MalformedKey { key } => assert_eq!(key, "abc"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn negative_key_is_malformed() {
        assert!(matches!(
            IdMap::<Value>::from_value(json!({"-1": {}})),
            Err(SessionError::MalformedKey { .. })
        ));
    }

    #[test]
    fn non_canonical_keys_are_malformed() {
        for key in ["007", "+7", " 7"] {
            let mut fields = Map::new();
            fields.insert("7".to_string(), json!({}));
            fields.insert(key.to_string(), json!({}));
            assert!(matches!(
                IdMap::<Value>::from_value(Value::Object(fields)),
                Err(SessionError::MalformedKey { key: k }) if k == key
            ));
        }
        assert_eq!(parse_object_id("0").unwrap(), 0);
    }

    #[test]
    fn null_is_empty_and_arrays_are_rejected() {
        assert!(IdMap::<Value>::from_value(Value::Null).unwrap().is_empty());
        assert!(matches!(
            IdMap::<Value>::from_value(json!([1, 2])),
            Err(SessionError::Decode(_))
        ));
    }

    #[test]
    fn serializes_with_string_keys() {
        let map: IdMap<Value> = [(3, json!("c")), (10, json!("j"))].into_iter().collect();
        assert_eq!(serde_json::to_value(&map).unwrap(), json!({"3": "c", "10": "j"}));
    }

    #[test]
    fn serde_path_reports_malformed_key() {
        let err = serde_json::from_str::<IdMap<Value>>(r#"{"x1": 0}"#).unwrap_err();
        assert!(err.to_string().contains("x1"));
    }

    #[test]
    fn loose_int_truncates_floats() {
        assert_eq!(loose_int(&json!(4)), Some(4));
        assert_eq!(loose_int(&json!(4.0)), Some(4));
        assert_eq!(loose_int(&json!("4")), None);
    }
}

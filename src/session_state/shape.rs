use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id_map::LenientDecode;
use crate::error_handling::types::SessionError;

/// Kind-dependent shape payload (box corners, polygon vertices, ...).
///
/// The store keeps it as untyped JSON so shapes of different kinds share one
/// map. Consumers that know the kind call [`Shape::decode_as`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Value);

impl Shape {
    pub fn new(value: Value) -> Self {
        Shape(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `kind` discriminator, when the producer wrote one.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }

    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        Ok(T::deserialize(&self.0)?)
    }
}

impl LenientDecode for Shape {
    fn decode_lenient(value: Value) -> Self {
        Shape(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rect {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    }

    #[test]
    fn heterogeneous_shapes_stay_untyped() {
        let rect = Shape::decode_lenient(json!({"kind": "rect", "x1": 0, "y1": 0, "x2": 4, "y2": 3}));
        let poly = Shape::decode_lenient(json!({"kind": "poly", "vertices": [[0, 0], [1, 1]]}));
        assert_eq!(rect.kind(), Some("rect"));
        assert_eq!(poly.kind(), Some("poly"));
        assert_eq!(poly.value()["vertices"][1], json!([1, 1]));
    }

    #[test]
    fn decode_as_reads_a_known_kind() {
        let shape = Shape::new(json!({"x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0}));
        let rect: Rect = shape.decode_as().unwrap();
        assert_eq!(rect, Rect { x1: 1.0, y1: 2.0, x2: 3.0, y2: 4.0 });
        assert!(matches!(
            Shape::new(json!([1, 2])).decode_as::<Rect>(),
            Err(SessionError::Decode(_))
        ));
    }
}

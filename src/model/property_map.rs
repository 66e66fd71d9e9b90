//! Property maps: the key-value attribute store on cells.

use std::collections::HashMap;
use super::Value;

/// A map of attribute names to values.
pub type PropertyMap = HashMap<String, Value>;

/// Build a PropertyMap from a JSON object. Anything else yields an empty map.
pub fn from_json(json: serde_json::Value) -> PropertyMap {
    match Value::from(json) {
        Value::Map(map) => map,
        _ => PropertyMap::new(),
    }
}

/// Render a PropertyMap as a JSON object.
pub fn to_json(props: &PropertyMap) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (k, v) in props {
        map.insert(k.clone(), serde_json::Value::from(v));
    }
    serde_json::Value::Object(map)
}

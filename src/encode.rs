//! Result encoding: normalizing adapter results into canonical text.
//!
//! Every adapter finishes a successful action here. Values that are already
//! strings pass through verbatim; everything else is serialized as compact
//! JSON. The module also owns the conversions between `rhai::Dynamic` and
//! `serde_json::Value` used at the boundary of the in-process engine.

use serde_json::Value;

/// Encode a decoded value into the canonical textual response form.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a Rhai `Dynamic` into a `serde_json::Value`.
pub fn dynamic_to_json(value: &rhai::Dynamic) -> Value {
    if value.is_string() {
        Value::String(value.clone().into_string().unwrap_or_default())
    } else if value.is_int() {
        Value::Number(serde_json::Number::from(value.clone().as_int().unwrap_or(0)))
    } else if value.is_float() {
        serde_json::json!(value.clone().as_float().unwrap_or(0.0))
    } else if value.is_bool() {
        Value::Bool(value.clone().as_bool().unwrap_or(false))
    } else if value.is_array() {
        let arr: Vec<rhai::Dynamic> = value.clone().into_array().unwrap_or_default();
        Value::Array(arr.iter().map(dynamic_to_json).collect())
    } else if value.is_map() {
        let map: rhai::Map = value.clone().cast();
        let mut json_map = serde_json::Map::new();
        for (k, v) in map.iter() {
            json_map.insert(k.to_string(), dynamic_to_json(v));
        }
        Value::Object(json_map)
    } else if value.is_unit() {
        Value::Null
    } else {
        Value::String(format!("{:?}", value))
    }
}

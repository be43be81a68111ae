use geojson::feature::Id;
use serde_json::Value;

pub(super) fn id_from_feature(id: Id) -> Option<String> {
    match id {
        Id::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Id::String(_) => None,
        Id::Number(n) => Some(n.to_string()),
    }
}

/// Reads an id out of a loosely typed property value
pub(super) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a yes/no flag the way OSM-derived exports spell it
pub(super) fn flag_from_str(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Some(false),
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub(super) fn flag_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Null => Some(false),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(text) => flag_from_str(text),
        _ => None,
    }
}

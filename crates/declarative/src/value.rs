//! Helpers over `serde_json::Value`, the closed value type used everywhere.

use serde_json::{Map, Value};

/// Parameters supplied by the user for one run.
pub type Params = Map<String, Value>;

/// Name of the field carrying an object's canonical locator.
pub const URL_FIELD: &str = "url";

/// Name of the field carrying an object's UUID.
pub const UUID_FIELD: &str = "uuid";

/// Whether `value` parses as a UUID (hyphenated, simple, braced or urn form).
pub fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// Whether `value` is an absolute `http://` or `https://` locator.
pub fn is_locator(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Last non-empty path segment of a locator, which is the object's UUID
/// for canonical backend URLs.
pub fn uuid_from_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Text used to look up a scalar reference. `None` for null and containers.
pub fn reference_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Whether a value is a scalar (anything but a list or an object).
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Compact JSON with object keys sorted at every level.
///
/// `Map` is ordered by key unless serde_json's `preserve_order` is enabled,
/// so the compact `Display` form is already canonical.
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}

/// A string field of an object, if present.
pub fn str_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// A non-null parameter value.
pub fn param<'a>(params: &'a Params, name: &str) -> Option<&'a Value> {
    params.get(name).filter(|v| !v.is_null())
}

//! State normalization for order-insensitive comparison.
//!
//! Backends return related collections in arbitrary order and with extra
//! server-populated fields; users supply them in whatever order they like,
//! often with fewer fields and sometimes as bare references. The helpers here
//! reduce both sides to a comparable form.

use crate::value::{URL_FIELD, canonical_json, is_scalar};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A value reduced for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The value as given (non-lists, and lists that cannot form a set).
    Value(Value),
    /// Canonical JSON forms of the list's items.
    Set(BTreeSet<String>),
}

/// Normalize a value for comparison.
///
/// - Non-lists are returned unchanged.
/// - An empty list is the empty set.
/// - A list of objects with non-empty `identity_keys`: each item gets
///   `defaults` backfilled, is projected onto exactly `identity_keys`
///   (absent keys become null) and contributes its canonical JSON form.
///   If any item is not an object the list is returned unchanged.
/// - A list of scalars becomes the set of their canonical forms.
/// - Anything else is returned unchanged.
pub fn normalize(value: &Value, identity_keys: &[String], defaults: &Map<String, Value>) -> Normalized {
    let Value::Array(items) = value else {
        return Normalized::Value(value.clone());
    };
    if items.is_empty() {
        return Normalized::Set(BTreeSet::new());
    }

    if !identity_keys.is_empty() && items[0].is_object() {
        let mut forms = BTreeSet::new();
        for item in items {
            let Value::Object(object) = item else {
                return Normalized::Value(value.clone());
            };
            let filled = apply_defaults(object, defaults);
            let projected: Map<String, Value> = identity_keys
                .iter()
                .map(|key| (key.clone(), filled.get(key).cloned().unwrap_or(Value::Null)))
                .collect();
            forms.insert(canonical_json(&Value::Object(projected)));
        }
        return Normalized::Set(forms);
    }

    if items.iter().all(is_scalar) {
        Normalized::Set(items.iter().map(canonical_json).collect())
    } else {
        Normalized::Value(value.clone())
    }
}

/// Copy of `item` with every missing key of `defaults` filled in.
pub fn apply_defaults(item: &Map<String, Value>, defaults: &Map<String, Value>) -> Map<String, Value> {
    let mut filled = item.clone();
    for (key, value) in defaults {
        filled.entry(key.clone()).or_insert_with(|| value.clone());
    }
    filled
}

/// The `field` of every object in a list, skipping items without it.
pub fn extract_references(items: &[Value], field: &str) -> Vec<Value> {
    items
        .iter()
        .filter_map(|item| item.get(field).cloned())
        .collect()
}

/// Keys the user actually supplied across the objects of a desired list.
pub fn supplied_keys(desired: &[Value]) -> BTreeSet<String> {
    desired
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|object| object.keys().cloned())
        .collect()
}

/// Restrict each object of `current` to `keys`. Non-objects pass through.
pub fn project_to_keys(current: &[Value], keys: &BTreeSet<String>) -> Vec<Value> {
    current
        .iter()
        .map(|item| match item {
            Value::Object(object) => Value::Object(
                object
                    .iter()
                    .filter(|(k, _)| keys.contains(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

fn object_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) if items.first().is_some_and(Value::is_object) => Some(items),
        _ => None,
    }
}

fn scalar_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) if items.first().is_some_and(|v| !v.is_object()) => Some(items),
        _ => None,
    }
}

/// Decide whether an action-managed collection differs from the backend.
///
/// - `supplied` is the raw user value, `resolved` the value after reference
///   resolution, `current` the backend's field.
/// - With `filter_keys`, when both the user value and the backend value are
///   lists of objects, the backend items are restricted to the keys the user
///   supplied plus the identity keys `defaults` covers, so server-populated
///   extras do not count as drift but defaulted fields still do.
/// - When the resolved value is a list of bare references and the backend
///   holds rich objects, the backend side is reduced to the objects' locators.
pub fn action_value_differs(
    supplied: &Value,
    resolved: &Value,
    current: &Value,
    identity_keys: &[String],
    defaults: &Map<String, Value>,
    filter_keys: bool,
) -> bool {
    let mut current = current.clone();

    if filter_keys
        && let (Some(desired_items), Some(current_items)) = (object_list(supplied), object_list(&current))
    {
        let mut keys = supplied_keys(desired_items);
        if !keys.is_empty() {
            keys.extend(
                identity_keys
                    .iter()
                    .filter(|key| defaults.contains_key(*key))
                    .cloned(),
            );
            current = Value::Array(project_to_keys(current_items, &keys));
        }
    }

    let normalized_old = match (scalar_list(resolved), object_list(&current)) {
        (Some(_), Some(current_items)) => normalize(
            &Value::Array(extract_references(current_items, URL_FIELD)),
            &[],
            &Map::new(),
        ),
        _ => normalize(&current, identity_keys, defaults),
    };
    let normalized_new = normalize(resolved, identity_keys, defaults);

    normalized_new != normalized_old
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn defaults(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_non_list_unchanged() {
        for value in [json!("x"), json!(5), json!(null), json!({"a": 1}), json!(true)] {
            assert_eq!(
                normalize(&value, &keys(&["a"]), &Map::new()),
                Normalized::Value(value.clone())
            );
        }
    }

    #[test]
    fn test_empty_list_is_empty_set() {
        assert_eq!(
            normalize(&json!([]), &[], &Map::new()),
            Normalized::Set(BTreeSet::new())
        );
    }

    #[test]
    fn test_scalar_list_order_insensitive() {
        let a = normalize(&json!(["b", "a", "c"]), &[], &Map::new());
        let b = normalize(&json!(["c", "b", "a"]), &[], &Map::new());
        assert_eq!(a, b);
    }

    #[test]
    fn test_scalar_list_distinguishes_types() {
        let a = normalize(&json!([1]), &[], &Map::new());
        let b = normalize(&json!(["1"]), &[], &Map::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_object_list_projection_ignores_extras_and_order() {
        let ids = keys(&["protocol", "from_port"]);
        let a = normalize(
            &json!([
                {"protocol": "tcp", "from_port": 22, "id": 1},
                {"protocol": "udp", "from_port": 53, "id": 2}
            ]),
            &ids,
            &Map::new(),
        );
        let b = normalize(
            &json!([
                {"from_port": 53, "protocol": "udp"},
                {"from_port": 22, "protocol": "tcp", "description": "ssh"}
            ]),
            &ids,
            &Map::new(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_defaults_backfill_before_projection() {
        let ids = keys(&["protocol", "cidr"]);
        let defs = defaults(json!({"cidr": "0.0.0.0/0"}));
        let user = normalize(&json!([{"protocol": "tcp"}]), &ids, &defs);
        let backend = normalize(&json!([{"protocol": "tcp", "cidr": "0.0.0.0/0"}]), &ids, &defs);
        assert_eq!(user, backend);
    }

    #[test]
    fn test_mixed_object_list_is_unchanged() {
        let value = json!([{"a": 1}, "b"]);
        assert_eq!(
            normalize(&value, &keys(&["a"]), &Map::new()),
            Normalized::Value(value.clone())
        );
    }

    #[test]
    fn test_object_list_without_keys_is_unchanged() {
        let value = json!([{"a": 1}]);
        assert_eq!(normalize(&value, &[], &Map::new()), Normalized::Value(value.clone()));
    }

    #[test]
    fn test_nested_list_is_unchanged() {
        let value = json!([["a"], ["b"]]);
        assert_eq!(normalize(&value, &[], &Map::new()), Normalized::Value(value.clone()));
    }

    #[test]
    fn test_apply_defaults_keeps_existing_values() {
        let item = defaults(json!({"a": 1}));
        let filled = apply_defaults(&item, &defaults(json!({"a": 2, "b": 3})));
        assert_eq!(Value::Object(filled), json!({"a": 1, "b": 3}));
    }

    #[test]
    fn test_extract_references_skips_missing() {
        let items = vec![json!({"url": "u1"}), json!({"name": "x"}), json!({"url": "u2"})];
        assert_eq!(extract_references(&items, "url"), vec![json!("u1"), json!("u2")]);
    }

    #[test]
    fn test_action_differs_filters_server_keys() {
        let supplied = json!([{"subnet": "s1", "fixed_ips": ["10.0.0.5"]}]);
        let current = json!([{"subnet": "s1", "fixed_ips": ["10.0.0.5"], "mac_address": "aa:bb"}]);
        assert!(!action_value_differs(
            &supplied,
            &supplied,
            &current,
            &keys(&["subnet", "fixed_ips"]),
            &Map::new(),
            true
        ));
    }

    #[test]
    fn test_action_differs_unfiltered_counts_server_keys() {
        let supplied = json!([{"subnet": "s1"}]);
        let current = json!([{"subnet": "s1", "mac_address": "aa:bb"}]);
        assert!(!action_value_differs(
            &supplied,
            &supplied,
            &current,
            &keys(&["subnet"]),
            &Map::new(),
            false
        ));
        assert!(action_value_differs(
            &supplied,
            &supplied,
            &json!([{"subnet": "s2", "mac_address": "aa:bb"}]),
            &keys(&["subnet"]),
            &Map::new(),
            false
        ));
    }

    #[test]
    fn test_action_differs_filtered_keeps_defaulted_keys() {
        let supplied = json!([{"protocol": "tcp", "port": 22}]);
        let ids = keys(&["protocol", "port", "cidr"]);
        let defs = defaults(json!({"cidr": "0.0.0.0/0"}));

        let narrowed = json!([{"protocol": "tcp", "port": 22, "cidr": "10.0.0.0/8", "id": 7}]);
        assert!(action_value_differs(&supplied, &supplied, &narrowed, &ids, &defs, true));
        assert!(action_value_differs(&supplied, &supplied, &narrowed, &ids, &defs, false));

        let open = json!([{"protocol": "tcp", "port": 22, "cidr": "0.0.0.0/0", "id": 7}]);
        assert!(!action_value_differs(&supplied, &supplied, &open, &ids, &defs, true));
        assert!(!action_value_differs(&supplied, &supplied, &open, &ids, &defs, false));
    }

    #[test]
    fn test_action_differs_cross_shape_references() {
        let resolved = json!(["https://api/sg/2/", "https://api/sg/1/"]);
        let current = json!([
            {"url": "https://api/sg/1/", "name": "default"},
            {"url": "https://api/sg/2/", "name": "web"}
        ]);
        assert!(!action_value_differs(&json!(["default", "web"]), &resolved, &current, &[], &Map::new(), false));

        let grown = json!(["https://api/sg/1/", "https://api/sg/2/", "https://api/sg/3/"]);
        assert!(action_value_differs(&json!(["a", "b", "c"]), &grown, &current, &[], &Map::new(), false));
    }

    #[test]
    fn test_action_differs_scalar_change() {
        assert!(action_value_differs(&json!("b"), &json!("b"), &json!("a"), &[], &Map::new(), false));
        assert!(!action_value_differs(&json!("a"), &json!("a"), &json!("a"), &[], &Map::new(), false));
    }
}

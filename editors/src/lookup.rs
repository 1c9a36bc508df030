//! Locating a field's schema and value by property path.

use serde_json::{Map, Value};

use cadence_schema::resolve_ref;

/// Follow `$ref` from `node` until a non-reference schema is reached.
///
/// Each hop must land on a different definition, so a reference loop stops
/// at the node where it was detected.
fn follow<'a>(root: &'a Value, mut node: &'a Value) -> &'a Value {
    let mut seen: Vec<&str> = Vec::new();
    while let Some(reference) = node.get("$ref").and_then(Value::as_str) {
        if seen.contains(&reference) {
            break;
        }
        let Some(target) = resolve_ref(root, reference) else {
            break;
        };
        seen.push(reference);
        node = target;
    }
    node
}

/// Merge a referencing property with its target: the target supplies the
/// structure, the property's own keywords (title, directives, defaults) win.
fn flatten(root: &Value, node: &Value) -> Value {
    let target = follow(root, node);
    if std::ptr::eq(target, node) {
        return node.clone();
    }
    let mut merged: Map<String, Value> = target.as_object().cloned().unwrap_or_default();
    if let Some(own) = node.as_object() {
        for (key, value) in own {
            if key != "$ref" {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

/// Schema of the field at `path`, with `$ref` indirection resolved for the
/// field itself, its direct `properties`, and its `items`.
///
/// Editors only look one level into a field, so deeper references are left
/// as they are.
#[must_use]
pub fn field_schema<S: AsRef<str>>(root: &Value, path: &[S]) -> Option<Value> {
    let mut node = root;
    for key in path {
        node = follow(root, node)
            .get("properties")?
            .as_object()?
            .get(key.as_ref())?;
    }

    let mut field = flatten(root, node);
    if let Some(object) = field.as_object_mut() {
        if let Some(Value::Object(properties)) = object.get_mut("properties") {
            for property in properties.values_mut() {
                *property = flatten(root, property);
            }
        }
        if let Some(items) = object.get_mut("items") {
            *items = flatten(root, items);
        }
    }
    Some(field)
}

/// Current value of the field at `path` inside a form document.
#[must_use]
pub fn value_at<'a, S: AsRef<str>>(form: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(form, |node, key| node.as_object()?.get(key.as_ref()))
}

/// Store `value` at `path`, creating intermediate objects (and replacing
/// non-object intermediates) as needed.
pub fn set_at<S: AsRef<str>>(form: &mut Value, path: &[S], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *form = value;
        return;
    };
    let mut node = form;
    for key in parents {
        node = ensure_object(node)
            .entry(key.as_ref().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.as_ref().to_string(), value);
}

pub(crate) fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

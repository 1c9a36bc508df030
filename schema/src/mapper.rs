//! Schema → hint tree extraction.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::tree::{DIRECTIVE_KEYS, UiHintTree};

const DEFS_REF_PREFIX: &str = "#/$defs/";

/// One pending level of the traversal.
struct Pending<'a> {
    properties: &'a Map<String, Value>,
    target: usize,
    /// `$defs` entries already entered on this branch.
    chain: Vec<&'a str>,
}

/// Nested object structure found for a property.
struct Nested<'a> {
    properties: &'a Map<String, Value>,
    via_def: Option<&'a str>,
}

/// Derive presentation hints from a JSON Schema.
///
/// Walks `properties` with an explicit work list. Each property's recognized
/// directives ([`DIRECTIVE_KEYS`]) are copied verbatim. A property whose
/// structure continues (inline `type: object` with `properties`, or a `$ref`
/// into `$defs` resolving to such an object) always gets a node and is
/// descended into; any other property gets a node only if it has directives.
///
/// Degrades instead of failing: a schema without `properties` yields an
/// empty tree, an unresolvable `$ref` is a leaf, and a `$ref` back into a
/// definition already entered on the same branch is a leaf.
#[must_use]
pub fn extract_ui_hints(schema: &Value) -> UiHintTree {
    let mut tree = UiHintTree::new();
    let Some(root_properties) = schema.get("properties").and_then(Value::as_object) else {
        return tree;
    };
    let defs = schema.get("$defs").and_then(Value::as_object);

    let mut work = vec![Pending {
        properties: root_properties,
        target: UiHintTree::root_id(),
        chain: Vec::new(),
    }];

    while let Some(Pending {
        properties,
        target,
        chain,
    }) = work.pop()
    {
        for (key, property) in properties {
            let Some(property) = property.as_object() else {
                continue;
            };

            let directives = collect_directives(property);

            match nested_structure(property, defs, &chain) {
                Some(nested) => {
                    let node = tree.insert(target, key, directives);
                    let mut branch = chain.clone();
                    if let Some(name) = nested.via_def {
                        branch.push(name);
                    }
                    work.push(Pending {
                        properties: nested.properties,
                        target: node,
                        chain: branch,
                    });
                }
                None if !directives.is_empty() => {
                    tree.insert(target, key, directives);
                }
                None => {}
            }
        }
    }

    tree
}

fn collect_directives(property: &Map<String, Value>) -> BTreeMap<String, Value> {
    DIRECTIVE_KEYS
        .iter()
        .filter_map(|key| {
            property
                .get(*key)
                .map(|value| ((*key).to_string(), value.clone()))
        })
        .collect()
}

fn object_properties(schema: &Map<String, Value>) -> Option<&Map<String, Value>> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return None;
    }
    schema.get("properties").and_then(Value::as_object)
}

fn nested_structure<'a>(
    property: &'a Map<String, Value>,
    defs: Option<&'a Map<String, Value>>,
    chain: &[&str],
) -> Option<Nested<'a>> {
    if let Some(properties) = object_properties(property) {
        return Some(Nested {
            properties,
            via_def: None,
        });
    }

    let reference = property.get("$ref").and_then(Value::as_str)?;
    let Some((name, definition)) = resolve_def(reference, defs) else {
        tracing::debug!(reference, "Unresolved $ref in schema; treating as leaf");
        return None;
    };
    if chain.contains(&name) {
        tracing::debug!(reference, "Circular $ref in schema; treating as leaf");
        return None;
    }

    object_properties(definition.as_object()?).map(|properties| Nested {
        properties,
        via_def: Some(name),
    })
}

/// Resolve a local `#/$defs/<name>` reference against `schema`'s root
/// definitions. Any other reference form resolves to `None`.
#[must_use]
pub fn resolve_ref<'a>(schema: &'a Value, reference: &str) -> Option<&'a Value> {
    let defs = schema.get("$defs").and_then(Value::as_object);
    resolve_def(reference, defs).map(|(_, definition)| definition)
}

/// Resolve `#/$defs/<name>` against the root definitions, returning the
/// stored key (so branch chains borrow from the schema) and its definition.
fn resolve_def<'a>(
    reference: &str,
    defs: Option<&'a Map<String, Value>>,
) -> Option<(&'a str, &'a Value)> {
    let encoded = reference.strip_prefix(DEFS_REF_PREFIX)?;
    if encoded.contains('/') {
        return None;
    }
    let name = encoded.replace("~1", "/").replace("~0", "~");
    defs?
        .get_key_value(name.as_str())
        .map(|(key, value)| (key.as_str(), value))
}

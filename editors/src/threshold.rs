//! Grid editor for `model → threshold → {value, disabled}` mappings.

use serde_json::{Map, Number, Value};

use crate::lookup::ensure_object;
use crate::{EditorError, FieldChange};

const VALUE_KEY: &str = "value";
const DISABLED_KEY: &str = "disabled";

/// One grid cell as read from the stored mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    pub value: f64,
    pub disabled: bool,
}

impl Cell {
    fn read(raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        Self {
            value: raw.get(VALUE_KEY).and_then(Value::as_f64).unwrap_or(0.0),
            disabled: raw
                .get(DISABLED_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// Partial cell update. Fields left `None` keep their stored value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellPatch {
    pub value: Option<f64>,
    pub disabled: Option<bool>,
}

impl CellPatch {
    #[must_use]
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            disabled: None,
        }
    }

    #[must_use]
    pub fn disabled(disabled: bool) -> Self {
        Self {
            value: None,
            disabled: Some(disabled),
        }
    }
}

/// A grid axis label: the stored key and its display title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    pub key: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub model: Axis,
    /// One cell per column, in column order.
    pub cells: Vec<Cell>,
}

/// Edits a threshold mapping as a grid.
///
/// Rows follow the model keys present in the current value; columns follow
/// the threshold properties declared on the first model in the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMatrixEditor {
    path: Vec<String>,
    title: Option<String>,
    models: Vec<Axis>,
    columns: Vec<Axis>,
}

fn title_of(key: &str, schema: Option<&Value>) -> String {
    schema
        .and_then(|schema| schema.get("title"))
        .and_then(Value::as_str)
        .map_or_else(|| key.to_string(), ToString::to_string)
}

fn axes(properties: Option<&Map<String, Value>>) -> Vec<Axis> {
    properties
        .into_iter()
        .flatten()
        .map(|(key, schema)| Axis {
            key: key.clone(),
            title: title_of(key, Some(schema)),
        })
        .collect()
}

impl ThresholdMatrixEditor {
    #[must_use]
    pub fn from_schema(path: Vec<String>, schema: &Value) -> Self {
        let model_schemas = schema.get("properties").and_then(Value::as_object);
        let columns = model_schemas
            .and_then(|models| models.values().next())
            .and_then(|first| first.get("properties"))
            .and_then(Value::as_object);

        Self {
            path,
            title: schema
                .get("title")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            models: axes(model_schemas),
            columns: axes(columns),
        }
    }

    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn columns(&self) -> &[Axis] {
        &self.columns
    }

    fn model_title(&self, key: &str) -> String {
        self.models
            .iter()
            .find(|model| model.key == key)
            .map_or_else(|| key.to_string(), |model| model.title.clone())
    }

    /// Grid rows for `value`. A non-object value has no rows; a missing
    /// cell reads as `{value: 0, disabled: false}`.
    #[must_use]
    pub fn rows(&self, value: &Value) -> Vec<Row> {
        let Some(models) = value.as_object() else {
            return Vec::new();
        };
        models
            .iter()
            .map(|(key, row)| Row {
                model: Axis {
                    key: key.clone(),
                    title: self.model_title(key),
                },
                cells: self
                    .columns
                    .iter()
                    .map(|column| Cell::read(row.get(&column.key)))
                    .collect(),
            })
            .collect()
    }

    #[must_use]
    pub fn cell(&self, value: &Value, model: &str, threshold: &str) -> Cell {
        Cell::read(value.get(model).and_then(|row| row.get(threshold)))
    }

    /// Apply `patch` to exactly one (model, threshold) cell and emit the
    /// whole updated mapping as one change.
    ///
    /// Every other cell, and every other key of the patched cell, is carried
    /// over untouched.
    pub fn patch(
        &self,
        current: &Value,
        model: &str,
        threshold: &str,
        patch: CellPatch,
    ) -> Result<FieldChange, EditorError> {
        let mut mapping = match current {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => {
                return Err(EditorError::NotAnObject {
                    path: self.path.clone(),
                });
            }
        };

        let known_model =
            mapping.contains_key(model) || self.models.iter().any(|axis| axis.key == model);
        let known_threshold = self.columns.iter().any(|axis| axis.key == threshold)
            || mapping
                .get(model)
                .and_then(Value::as_object)
                .is_some_and(|row| row.contains_key(threshold));
        if !known_model || !known_threshold {
            return Err(EditorError::UnknownCell {
                model: model.to_string(),
                threshold: threshold.to_string(),
            });
        }

        let value = patch
            .value
            .map(|value| {
                Number::from_f64(value).ok_or_else(|| EditorError::NonFinite {
                    model: model.to_string(),
                    threshold: threshold.to_string(),
                })
            })
            .transpose()?;

        let row = ensure_object(
            mapping
                .entry(model.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        );
        let cell = ensure_object(
            row.entry(threshold.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        );
        if let Some(value) = value {
            cell.insert(VALUE_KEY.to_string(), Value::Number(value));
        }
        if let Some(disabled) = patch.disabled {
            cell.insert(DISABLED_KEY.to_string(), Value::Bool(disabled));
        }

        tracing::debug!(path = ?self.path, model, threshold, "Threshold cell patched");
        Ok(FieldChange {
            path: self.path.clone(),
            value: Value::Object(mapping),
        })
    }
}

//! Checklist editor for string-array fields with a declared option set.

use serde_json::Value;

use crate::{EditorError, FieldChange};

/// Aggregate state of the select-all checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    None,
    /// Some but not all options selected (indeterminate).
    Partial,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelectEditor {
    path: Vec<String>,
    title: Option<String>,
    options: Vec<String>,
}

fn string_options(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
        ),
        Value::String(joined) => Some(
            joined
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(ToString::to_string)
                .collect(),
        ),
        _ => None,
    }
}

fn declared_options(schema: &Value) -> Vec<String> {
    let declared = schema
        .get("enum")
        .filter(|value| value.is_array())
        .or_else(|| {
            schema
                .get("items")
                .and_then(|items| items.get("enum"))
                .filter(|value| value.is_array())
        })
        .or_else(|| schema.get("default"))
        .and_then(string_options)
        .unwrap_or_default();

    let mut options: Vec<String> = Vec::with_capacity(declared.len());
    for option in declared {
        if !options.contains(&option) {
            options.push(option);
        }
    }
    options
}

impl MultiSelectEditor {
    /// Options come from `enum`, then `items.enum`, then `default` (an array,
    /// or a comma-separated string).
    #[must_use]
    pub fn from_schema(path: Vec<String>, schema: &Value) -> Self {
        Self {
            path,
            title: schema
                .get("title")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            options: declared_options(schema),
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
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Declared options present in `value`, in declaration order.
    #[must_use]
    pub fn selected(&self, value: &Value) -> Vec<String> {
        let chosen: Vec<&str> = value
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        self.options
            .iter()
            .filter(|option| chosen.contains(&option.as_str()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn state(&self, value: &Value) -> SelectionState {
        let selected = self.selected(value).len();
        if selected == 0 {
            SelectionState::None
        } else if selected == self.options.len() {
            SelectionState::All
        } else {
            SelectionState::Partial
        }
    }

    /// Flip one option.
    pub fn toggle(&self, value: &Value, option: &str) -> Result<FieldChange, EditorError> {
        if !self.options.iter().any(|known| known == option) {
            return Err(EditorError::UnknownOption {
                path: self.path.clone(),
                option: option.to_string(),
            });
        }
        let mut selected = self.selected(value);
        if let Some(pos) = selected.iter().position(|chosen| chosen == option) {
            selected.remove(pos);
        } else {
            selected.push(option.to_string());
        }
        Ok(self.set(selected))
    }

    /// Select-all: clears when everything is selected, otherwise selects the
    /// full option set.
    #[must_use]
    pub fn toggle_all(&self, value: &Value) -> FieldChange {
        if self.state(value) == SelectionState::All {
            self.set(Vec::<String>::new())
        } else {
            self.set(self.options.clone())
        }
    }

    /// Replace the selection. Unknown options are dropped and the result
    /// follows declaration order.
    #[must_use]
    pub fn set<I, S>(&self, values: I) -> FieldChange
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: Vec<S> = values.into_iter().collect();
        let value = self
            .options
            .iter()
            .filter(|option| requested.iter().any(|r| r.as_ref() == option.as_str()))
            .map(|option| Value::String(option.clone()))
            .collect();
        FieldChange {
            path: self.path.clone(),
            value: Value::Array(value),
        }
    }
}

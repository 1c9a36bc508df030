//! Presentation hints for schema-driven configuration forms.
//!
//! [`extract_ui_hints`] walks a JSON Schema (including `$ref` indirection
//! through `$defs`) and produces a sparse [`UiHintTree`]: only properties
//! carrying a directive, or leading to properties that do, get a node. The
//! tree's [`Widget`] lookups are what binds specialized editors to fields.

mod mapper;
mod tree;
mod widget;

pub use mapper::{extract_ui_hints, resolve_ref};
pub use tree::{CLASS_NAMES_KEY, DIRECTIVE_KEYS, FIELD_KEY, HintRef, UiHintTree};
pub use widget::Widget;

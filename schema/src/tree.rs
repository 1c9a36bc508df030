//! Sparse presentation-hint tree.
//!
//! Nodes live in a flat arena with parent links, so building, comparing,
//! exporting and dropping a tree never recurse, however deep the schema was.

use std::collections::BTreeMap;
use std::mem::take;

use serde_json::{Map, Value};

use crate::Widget;

/// Directive key selecting a widget.
pub const FIELD_KEY: &str = "ui:field";
/// Directive key carrying a layout class.
pub const CLASS_NAMES_KEY: &str = "ui:classNames";
/// Directive keys copied from schema properties into hint nodes.
pub const DIRECTIVE_KEYS: &[&str] = &[FIELD_KEY, CLASS_NAMES_KEY];

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct HintNode {
    /// Parent index and the property key this node hangs under. `None` for the root.
    parent: Option<(usize, String)>,
    directives: BTreeMap<String, Value>,
    children: BTreeMap<String, usize>,
}

/// Presentation hints mirroring a schema's property structure.
///
/// A node exists only when it carries a directive or owns descendants that
/// do (nested objects are materialized unconditionally when descended into).
#[derive(Debug, Clone)]
pub struct UiHintTree {
    nodes: Vec<HintNode>,
}

impl Default for UiHintTree {
    fn default() -> Self {
        Self::new()
    }
}

impl UiHintTree {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![HintNode::default()],
        }
    }

    /// Attach a node under `parent`. Returns the new node's index.
    pub(crate) fn insert(
        &mut self,
        parent: usize,
        key: &str,
        directives: BTreeMap<String, Value>,
    ) -> usize {
        debug_assert!(parent < self.nodes.len(), "hint parent must exist");
        let id = self.nodes.len();
        self.nodes.push(HintNode {
            parent: Some((parent, key.to_string())),
            directives,
            children: BTreeMap::new(),
        });
        self.nodes[parent].children.insert(key.to_string(), id);
        id
    }

    pub(crate) const fn root_id() -> usize {
        ROOT
    }

    #[must_use]
    pub fn root(&self) -> HintRef<'_> {
        HintRef { tree: self, id: ROOT }
    }

    /// Number of hint nodes below the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Follow a property path from the root.
    #[must_use]
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<HintRef<'_>> {
        let mut node = self.root();
        for key in path {
            node = node.child(key.as_ref())?;
        }
        Some(node)
    }

    /// Every node below the root with its property path, parents before children.
    #[must_use]
    pub fn walk(&self) -> Vec<(Vec<String>, HintRef<'_>)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(Vec<String>, usize)> = self.nodes[ROOT]
            .children
            .iter()
            .rev()
            .map(|(key, id)| (vec![key.clone()], *id))
            .collect();

        while let Some((path, id)) = stack.pop() {
            for (key, child) in self.nodes[id].children.iter().rev() {
                let mut child_path = path.clone();
                child_path.push(key.clone());
                stack.push((child_path, *child));
            }
            out.push((path, HintRef { tree: self, id }));
        }
        out
    }

    /// Paths of every field that selects a non-default widget.
    #[must_use]
    pub fn widgets(&self) -> Vec<(Vec<String>, Widget)> {
        self.walk()
            .into_iter()
            .filter_map(|(path, node)| {
                let widget = node.widget();
                (!widget.is_default()).then_some((path, widget))
            })
            .collect()
    }

    /// Export in the form renderer's `uiSchema` shape: each object holds the
    /// node's directives and its children side by side.
    #[must_use]
    pub fn to_ui_schema(&self) -> Value {
        let mut built: Vec<Map<String, Value>> = self
            .nodes
            .iter()
            .map(|node| {
                node.directives
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .collect();

        // Children always have larger indices than their parents, so a reverse
        // sweep finishes every subtree before attaching it.
        for id in (1..self.nodes.len()).rev() {
            let map = take(&mut built[id]);
            if let Some((parent, key)) = &self.nodes[id].parent {
                built[*parent].insert(key.clone(), Value::Object(map));
            }
        }

        Value::Object(take(&mut built[ROOT]))
    }
}

impl PartialEq for UiHintTree {
    /// Structural equality: same keys, same directives, same shape.
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(ROOT, ROOT)];
        while let Some((a, b)) = pending.pop() {
            let (left, right) = (&self.nodes[a], &other.nodes[b]);
            if left.directives != right.directives || left.children.len() != right.children.len()
            {
                return false;
            }
            for ((left_key, left_id), (right_key, right_id)) in
                left.children.iter().zip(right.children.iter())
            {
                if left_key != right_key {
                    return false;
                }
                pending.push((*left_id, *right_id));
            }
        }
        true
    }
}

impl Eq for UiHintTree {}

/// Borrowed view of one hint node.
#[derive(Debug, Clone, Copy)]
pub struct HintRef<'a> {
    tree: &'a UiHintTree,
    id: usize,
}

impl<'a> HintRef<'a> {
    fn node(&self) -> &'a HintNode {
        &self.tree.nodes[self.id]
    }

    #[must_use]
    pub fn directive(&self, key: &str) -> Option<&'a Value> {
        self.node().directives.get(key)
    }

    #[must_use]
    pub fn directives(&self) -> &'a BTreeMap<String, Value> {
        &self.node().directives
    }

    /// Raw `ui:field` selector, if it is a string.
    #[must_use]
    pub fn selector(&self) -> Option<&'a str> {
        self.directive(FIELD_KEY).and_then(Value::as_str)
    }

    #[must_use]
    pub fn class_names(&self) -> Option<&'a str> {
        self.directive(CLASS_NAMES_KEY).and_then(Value::as_str)
    }

    #[must_use]
    pub fn widget(&self) -> Widget {
        self.selector().map_or(Widget::Default, Widget::from_selector)
    }

    #[must_use]
    pub fn child(&self, key: &str) -> Option<HintRef<'a>> {
        let id = *self.node().children.get(key)?;
        Some(HintRef {
            tree: self.tree,
            id,
        })
    }

    pub fn children(self) -> impl Iterator<Item = (&'a str, HintRef<'a>)> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |(key, id)| (key.as_str(), HintRef { tree, id: *id }))
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.node().children.is_empty()
    }
}

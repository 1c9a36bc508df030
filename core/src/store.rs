//! Immutable snapshot of one loaded scope.
//!
//! Every transition (selection, activation, description edit) builds a new
//! [`ScopeState`]; nothing is mutated in place. The version list always
//! starts with the draft sentinel and holds at most one active version.

use serde_json::Value;

use cadence_editors::{FieldEditor, bind_form};
use cadence_registry::ScopeSnapshot;
use cadence_schema::{UiHintTree, extract_ui_hints};
use cadence_types::{ConfigVersion, Payload, Scope, VersionId};

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeState {
    scope: Scope,
    schema: Value,
    hints: UiHintTree,
    versions: Vec<ConfigVersion>,
    selected: VersionId,
    description: String,
}

impl ScopeState {
    /// Build the local view of a registry snapshot.
    ///
    /// An id-0 entry in the snapshot is the registry's draft template and is
    /// not kept as a stored version; without one the first stored version's
    /// payload seeds the draft. `prefer` keeps a previous selection when that
    /// id is still listed; otherwise the active version, then the first
    /// stored one, is selected.
    #[must_use]
    pub fn from_snapshot(scope: Scope, snapshot: ScopeSnapshot, prefer: Option<VersionId>) -> Self {
        let ScopeSnapshot { schema, versions } = snapshot;

        let mut template = None;
        let mut stored = Vec::with_capacity(versions.len() + 1);
        let mut seen_active = false;
        for version in versions {
            if version.is_draft() {
                template.get_or_insert_with(|| version.payload().clone());
                continue;
            }
            if version.is_active() {
                if seen_active {
                    tracing::warn!(
                        scope = %scope,
                        version = %version.id(),
                        "Registry reported several active versions; keeping the first"
                    );
                    stored.push(version.with_active(false));
                    continue;
                }
                seen_active = true;
            }
            stored.push(version);
        }

        let template = template
            .or_else(|| stored.first().map(|version| version.payload().clone()))
            .unwrap_or_else(Payload::empty);
        stored.insert(0, ConfigVersion::draft(template));

        let hints = extract_ui_hints(&schema);
        let mut state = Self {
            scope,
            schema,
            hints,
            versions: stored,
            selected: VersionId::DRAFT,
            description: String::new(),
        };

        let selected = prefer
            .filter(|id| state.version(*id).is_some())
            .or_else(|| state.active().map(ConfigVersion::id))
            .or_else(|| state.stored().next().map(ConfigVersion::id))
            .unwrap_or(VersionId::DRAFT);
        state.set_selection(selected);
        state.check_invariants();
        state
    }

    fn check_invariants(&self) {
        assert!(
            self.versions.first().is_some_and(ConfigVersion::is_draft),
            "version list must start with the draft sentinel"
        );
        debug_assert!(
            self.versions.iter().filter(|v| v.is_active()).count() <= 1,
            "at most one version may be active per scope"
        );
    }

    fn set_selection(&mut self, id: VersionId) {
        self.selected = id;
        self.description = self
            .version(id)
            .map(|version| version.description().to_string())
            .unwrap_or_default();
    }

    /// Point the selection at `id`. Unknown ids are allowed and read as an
    /// empty description.
    #[must_use]
    pub fn with_selection(&self, id: VersionId) -> Self {
        let mut next = self.clone();
        next.set_selection(id);
        next
    }

    #[must_use]
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }

    /// Mirror an accepted activation toggle: `id` takes `active`, every other
    /// version is cleared, and `id` becomes the selection.
    #[must_use]
    pub fn with_activation(&self, id: VersionId, active: bool) -> Self {
        let versions = self
            .versions
            .iter()
            .map(|version| version.with_active(version.id() == id && active))
            .collect();
        let mut next = Self {
            versions,
            ..self.clone()
        };
        next.set_selection(id);
        next.check_invariants();
        next
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    #[must_use]
    pub fn hints(&self) -> &UiHintTree {
        &self.hints
    }

    /// Editors for every hinted field with a specialized widget.
    #[must_use]
    pub fn editors(&self) -> Vec<FieldEditor> {
        bind_form(&self.schema, &self.hints)
    }

    /// All versions, draft first.
    #[must_use]
    pub fn versions(&self) -> &[ConfigVersion] {
        &self.versions
    }

    /// Versions stored in the registry (everything but the draft).
    pub fn stored(&self) -> impl Iterator<Item = &ConfigVersion> {
        self.versions.iter().skip(1)
    }

    #[must_use]
    pub fn draft(&self) -> &ConfigVersion {
        &self.versions[0]
    }

    #[must_use]
    pub fn version(&self, id: VersionId) -> Option<&ConfigVersion> {
        self.versions.iter().find(|version| version.id() == id)
    }

    #[must_use]
    pub fn active(&self) -> Option<&ConfigVersion> {
        self.versions.iter().find(|version| version.is_active())
    }

    #[must_use]
    pub fn selected_id(&self) -> VersionId {
        self.selected
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ConfigVersion> {
        self.version(self.selected)
    }

    /// Pending description of the selection, as edited by the operator.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

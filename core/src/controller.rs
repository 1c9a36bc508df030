//! Versioned configuration state machine.
//!
//! [`ConfigController`] owns the loaded [`ScopeState`] and mediates every
//! remote call that changes it. Two rules keep racing responses out:
//!
//! - Each load takes a generation number; only the newest load for the
//!   targeted scope may apply its response.
//! - Mutation results apply only while their scope is still targeted.
//!
//! Anything discarded by those rules returns [`Outcome::Stale`]. Mutations
//! are serialized through one async gate; loads bypass it so switching scope
//! never waits on an in-flight save.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;

use cadence_registry::Registry;
use cadence_types::{Payload, PluginDescriptor, PluginId, Scope, VersionId};

use crate::errors::{ErrorKind, ScopedError};
use crate::store::ScopeState;

/// Result of an operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The response arrived after the selection moved on and was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoadTicket {
    scope: Scope,
    generation: u64,
}

#[derive(Debug, Default)]
struct ControllerState {
    target: Option<Scope>,
    generation: u64,
    current: Option<Arc<ScopeState>>,
    plugins: Arc<[PluginDescriptor]>,
}

impl ControllerState {
    fn admits(&self, ticket: LoadTicket) -> bool {
        self.target == Some(ticket.scope) && self.generation == ticket.generation
    }

    /// The loaded state, if it belongs to `scope` and `scope` is targeted.
    fn current_for(&self, scope: Scope) -> Option<&Arc<ScopeState>> {
        self.current
            .as_ref()
            .filter(|state| self.target == Some(scope) && state.scope() == scope)
    }
}

pub struct ConfigController {
    registry: Arc<dyn Registry>,
    state: Mutex<ControllerState>,
    gate: AsyncMutex<()>,
}

impl std::fmt::Debug for ConfigController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ConfigController")
            .field("target", &state.target)
            .field("generation", &state.generation)
            .field("loaded", &state.current.as_ref().map(|s| s.scope()))
            .finish_non_exhaustive()
    }
}

impl ConfigController {
    #[must_use]
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            state: Mutex::new(ControllerState::default()),
            gate: AsyncMutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        // No update panics halfway, so a poisoned state is still consistent.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The scope the controller is pointed at, loaded or not.
    #[must_use]
    pub fn target(&self) -> Option<Scope> {
        self.lock().target
    }

    /// The loaded snapshot of the targeted scope.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ScopeState>> {
        let state = self.lock();
        let target = state.target?;
        state.current_for(target).cloned()
    }

    #[must_use]
    pub fn plugins(&self) -> Arc<[PluginDescriptor]> {
        Arc::clone(&self.lock().plugins)
    }

    pub async fn refresh_plugins(&self) -> Result<Outcome, ScopedError> {
        let plugins = self
            .registry
            .list_plugins()
            .await
            .map_err(ScopedError::unscoped)?;
        tracing::debug!(count = plugins.len(), "Plugin list refreshed");
        self.lock().plugins = plugins.into();
        Ok(Outcome::Applied)
    }

    /// Point at `scope` and fetch its schema and versions, replacing the
    /// local list wholesale.
    pub async fn load(&self, scope: Scope) -> Result<Outcome, ScopedError> {
        let ticket = {
            let mut state = self.lock();
            if state.target != Some(scope) {
                state.current = None;
            }
            state.target = Some(scope);
            state.generation += 1;
            LoadTicket {
                scope,
                generation: state.generation,
            }
        };
        tracing::debug!(scope = %scope, generation = ticket.generation, "Loading scope");
        self.fetch_and_apply(ticket, None).await
    }

    /// Stop targeting any scope. In-flight loads and mutations go stale.
    pub fn unload(&self) {
        let mut state = self.lock();
        state.target = None;
        state.generation += 1;
        state.current = None;
    }

    /// Reload after a mutation, only while `scope` is still targeted.
    async fn reload(
        &self,
        scope: Scope,
        prefer: Option<VersionId>,
    ) -> Result<Outcome, ScopedError> {
        let ticket = {
            let mut state = self.lock();
            if state.target != Some(scope) {
                return Ok(Outcome::Stale);
            }
            state.generation += 1;
            LoadTicket {
                scope,
                generation: state.generation,
            }
        };
        self.fetch_and_apply(ticket, prefer).await
    }

    async fn fetch_and_apply(
        &self,
        ticket: LoadTicket,
        prefer: Option<VersionId>,
    ) -> Result<Outcome, ScopedError> {
        let fetched = self.registry.fetch_scope(ticket.scope).await;

        let mut state = self.lock();
        if !state.admits(ticket) {
            tracing::debug!(
                scope = %ticket.scope,
                generation = ticket.generation,
                "Discarding superseded load"
            );
            return Ok(Outcome::Stale);
        }
        let snapshot = fetched.map_err(|err| ScopedError::new(ticket.scope, err))?;
        let next = ScopeState::from_snapshot(ticket.scope, snapshot, prefer);
        tracing::debug!(
            scope = %ticket.scope,
            versions = next.stored().count(),
            selected = %next.selected_id(),
            "Scope loaded"
        );
        state.current = Some(Arc::new(next));
        Ok(Outcome::Applied)
    }

    /// The targeted, loaded state, or `NotLoaded`.
    fn loaded(&self) -> Result<Arc<ScopeState>, ScopedError> {
        let state = self.lock();
        let Some(scope) = state.target else {
            return Err(ScopedError::unscoped(ErrorKind::NotLoaded));
        };
        state
            .current_for(scope)
            .cloned()
            .ok_or_else(|| ScopedError::new(scope, ErrorKind::NotLoaded))
    }

    /// Swap in a snapshot derived from the current one, if `base`'s scope
    /// is still loaded and targeted.
    fn replace_current(
        &self,
        base: &ScopeState,
        derive: impl FnOnce(&ScopeState) -> ScopeState,
    ) -> Outcome {
        let mut state = self.lock();
        let next = state
            .current_for(base.scope())
            .map(|current| derive(current));
        match next {
            Some(next) => {
                state.current = Some(Arc::new(next));
                Outcome::Applied
            }
            None => Outcome::Stale,
        }
    }

    fn still_targeted(&self, scope: Scope) -> bool {
        self.lock().target == Some(scope)
    }

    /// Change the selection. Unknown ids select nothing stored and read as
    /// an empty description.
    pub fn select_version(&self, id: VersionId) -> Result<Outcome, ScopedError> {
        let base = self.loaded()?;
        Ok(self.replace_current(&base, |current| current.with_selection(id)))
    }

    /// Edit the pending description of the selection.
    pub fn set_description(&self, description: &str) -> Result<Outcome, ScopedError> {
        let base = self.loaded()?;
        Ok(self.replace_current(&base, |current| current.with_description(description)))
    }

    /// Store `payload`: a create when `as_new` is set or the draft is
    /// selected, otherwise an update of the selection. Reloads on success,
    /// keeping the selection when it still exists.
    pub async fn save(
        &self,
        payload: &Payload,
        description: &str,
        as_new: bool,
    ) -> Result<Outcome, ScopedError> {
        let _gate = self.gate.lock().await;
        let base = self.loaded()?;
        let scope = base.scope();
        let selected = base.selected_id();

        let config = payload
            .parse()
            .map_err(|err| ScopedError::new(scope, ErrorKind::InvalidPayload(err)))?;

        let create = as_new || selected.is_draft();
        if !create {
            Self::check_stored_target(&base, selected)?;
        }
        let sent = if create {
            self.registry.create_version(scope, &config, description).await
        } else {
            self.registry
                .update_version(selected, &config, description)
                .await
        };
        if !self.still_targeted(scope) {
            return Ok(Outcome::Stale);
        }
        let reply = sent.map_err(|err| ScopedError::new(scope, err))?;
        tracing::info!(
            scope = %scope,
            version = %selected,
            created = create,
            "Configuration saved"
        );
        tracing::debug!(scope = %scope, reply = %reply, "Save acknowledged");

        self.reload(scope, Some(selected)).await
    }

    /// Toggle activation of a stored version. On success the local list
    /// mirrors the registry's exclusivity: `id` takes `active`, all others
    /// are cleared, and `id` becomes the selection.
    pub async fn activate(&self, id: VersionId, active: bool) -> Result<Outcome, ScopedError> {
        let _gate = self.gate.lock().await;
        let base = self.loaded()?;
        let scope = base.scope();
        Self::check_stored_target(&base, id)?;

        let sent = self.registry.set_activation(id, active).await;
        if !self.still_targeted(scope) {
            return Ok(Outcome::Stale);
        }
        let reply = sent.map_err(|err| ScopedError::new(scope, err))?;
        if !reply.success {
            tracing::warn!(scope = %scope, version = %id, "Activation refused");
            return Err(ScopedError::new(
                scope,
                ErrorKind::ActivationRejected {
                    id,
                    body: reply.body,
                },
            ));
        }

        tracing::info!(scope = %scope, version = %id, active, "Activation toggled");
        Ok(self.replace_current(&base, |current| current.with_activation(id, active)))
    }

    /// Delete a stored version, then reload with the default selection.
    pub async fn delete(&self, id: VersionId) -> Result<Outcome, ScopedError> {
        let _gate = self.gate.lock().await;
        let base = self.loaded()?;
        let scope = base.scope();
        Self::check_stored_target(&base, id)?;

        let sent = self.registry.delete_version(id).await;
        if !self.still_targeted(scope) {
            return Ok(Outcome::Stale);
        }
        sent.map_err(|err| ScopedError::new(scope, err))?;
        tracing::info!(scope = %scope, version = %id, "Version deleted");

        self.reload(scope, None).await
    }

    /// Ask the registry to re-import the targeted plugin's package, then
    /// reload keeping the selection.
    pub async fn reload_plugin(&self) -> Result<Outcome, ScopedError> {
        let _gate = self.gate.lock().await;
        let base = self.loaded()?;
        let scope = base.scope();

        let package = match self.package_of(scope.plugin) {
            Some(package) => package,
            None => {
                self.refresh_plugins()
                    .await
                    .map_err(|err| ScopedError { scope: Some(scope), ..err })?;
                self.package_of(scope.plugin).ok_or_else(|| {
                    ScopedError::new(scope, ErrorKind::UnknownPlugin(scope.plugin))
                })?
            }
        };

        let sent = self.registry.reload_plugin(&package).await;
        if !self.still_targeted(scope) {
            return Ok(Outcome::Stale);
        }
        sent.map_err(|err| ScopedError::new(scope, err))?;
        tracing::info!(scope = %scope, package = %package, "Plugin reloaded");

        self.reload(scope, Some(base.selected_id())).await
    }

    fn package_of(&self, plugin: PluginId) -> Option<String> {
        self.lock()
            .plugins
            .iter()
            .find(|descriptor| descriptor.id == plugin)
            .map(|descriptor| descriptor.package.clone())
    }

    fn check_stored_target(base: &ScopeState, id: VersionId) -> Result<(), ScopedError> {
        if id.is_draft() {
            return Err(ScopedError::new(base.scope(), ErrorKind::InvalidTarget(id)));
        }
        if base.version(id).is_none() {
            return Err(ScopedError::new(base.scope(), ErrorKind::UnknownVersion(id)));
        }
        Ok(())
    }
}

//! In-memory collaborators for controller and console tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;

use cadence_logstream::{LogFeed, LogSource, LogStreamError};
use cadence_registry::{ActivationReply, Registry, RegistryError, ScopeSnapshot};
use cadence_types::{
    ConfigVersion, Payload, PluginDescriptor, PluginId, Scope, SessionId, VersionId,
};

pub(crate) fn scope(plugin: u64, session: u64) -> Scope {
    Scope::new(PluginId::new(plugin), SessionId::new(session))
}

pub(crate) fn version(id: u64, active: bool, payload: Value) -> ConfigVersion {
    ConfigVersion::new(
        VersionId::new(id),
        format!("v{id}"),
        active,
        Payload::from_value(&payload),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ListPlugins,
    Fetch(Scope),
    Create {
        scope: Scope,
        config: Value,
        description: String,
    },
    Update {
        id: VersionId,
        config: Value,
        description: String,
    },
    Delete(VersionId),
    Activate(VersionId, bool),
    Reload(String),
}

/// Registry that behaves like the real one over an in-memory table.
#[derive(Default)]
pub(crate) struct FakeRegistry {
    scopes: Mutex<HashMap<Scope, ScopeSnapshot>>,
    plugins: Mutex<Vec<PluginDescriptor>>,
    calls: Mutex<Vec<Call>>,
    holds: Mutex<HashMap<Scope, VecDeque<oneshot::Receiver<()>>>>,
    refuse_activation: AtomicBool,
    fail_next: Mutex<Option<RegistryError>>,
}

impl FakeRegistry {
    pub(crate) fn with_scope(self, scope: Scope, versions: Vec<ConfigVersion>) -> Self {
        self.scopes.lock().unwrap().insert(
            scope,
            ScopeSnapshot {
                schema: json!({
                    "type": "object",
                    "properties": {
                        "models": { "type": "array", "ui:field": "MultiSelect",
                                    "items": { "enum": ["a", "b"] } }
                    }
                }),
                versions,
            },
        );
        self
    }

    pub(crate) fn with_plugin(self, id: u64, package: &str) -> Self {
        self.plugins.lock().unwrap().push(PluginDescriptor {
            id: PluginId::new(id),
            package: package.to_string(),
            description: None,
            interval: 60,
        });
        self
    }

    /// The next fetch of `scope` waits until the returned sender fires.
    pub(crate) fn hold(&self, scope: Scope) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.holds
            .lock()
            .unwrap()
            .entry(scope)
            .or_default()
            .push_back(rx);
        tx
    }

    pub(crate) fn refuse_activation(&self) {
        self.refuse_activation.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_next(&self, status: u16, body: &str) {
        *self.fail_next.lock().unwrap() = Some(RegistryError::Status {
            status,
            body: body.to_string(),
        });
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Fetch(_) | Call::ListPlugins))
            .collect()
    }

    pub(crate) fn stored(&self, scope: Scope, id: u64) -> Option<ConfigVersion> {
        self.scopes.lock().unwrap().get(&scope).and_then(|snapshot| {
            snapshot
                .versions
                .iter()
                .find(|v| v.id() == VersionId::new(id))
                .cloned()
        })
    }

    fn record(&self, call: Call) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn edit_versions(&self, id: VersionId, edit: impl FnOnce(&mut Vec<ConfigVersion>, usize)) {
        let mut scopes = self.scopes.lock().unwrap();
        for snapshot in scopes.values_mut() {
            if let Some(index) = snapshot.versions.iter().position(|v| v.id() == id) {
                edit(&mut snapshot.versions, index);
                return;
            }
        }
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, RegistryError> {
        self.record(Call::ListPlugins)?;
        Ok(self.plugins.lock().unwrap().clone())
    }

    async fn fetch_scope(&self, scope: Scope) -> Result<ScopeSnapshot, RegistryError> {
        self.record(Call::Fetch(scope))?;
        let hold = self
            .holds
            .lock()
            .unwrap()
            .get_mut(&scope)
            .and_then(VecDeque::pop_front);
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        self.scopes
            .lock()
            .unwrap()
            .get(&scope)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                path: format!("schema/{}/{}", scope.session, scope.plugin),
            })
    }

    async fn create_version(
        &self,
        scope: Scope,
        config: &Value,
        description: &str,
    ) -> Result<Value, RegistryError> {
        self.record(Call::Create {
            scope,
            config: config.clone(),
            description: description.to_string(),
        })?;
        let mut scopes = self.scopes.lock().unwrap();
        let next_id = scopes
            .values()
            .flat_map(|snapshot| snapshot.versions.iter().map(|v| v.id().value()))
            .max()
            .unwrap_or(0)
            + 1;
        if let Some(snapshot) = scopes.get_mut(&scope) {
            snapshot.versions.push(ConfigVersion::new(
                VersionId::new(next_id),
                description,
                false,
                Payload::from_value(config),
            ));
        }
        Ok(json!({ "id": next_id }))
    }

    async fn update_version(
        &self,
        id: VersionId,
        config: &Value,
        description: &str,
    ) -> Result<Value, RegistryError> {
        self.record(Call::Update {
            id,
            config: config.clone(),
            description: description.to_string(),
        })?;
        self.edit_versions(id, |versions, index| {
            let active = versions[index].is_active();
            versions[index] =
                ConfigVersion::new(id, description, active, Payload::from_value(config));
        });
        Ok(json!({ "id": id }))
    }

    async fn delete_version(&self, id: VersionId) -> Result<Value, RegistryError> {
        self.record(Call::Delete(id))?;
        self.edit_versions(id, |versions, index| {
            versions.remove(index);
        });
        Ok(json!({ "deleted": id }))
    }

    async fn set_activation(
        &self,
        id: VersionId,
        active: bool,
    ) -> Result<ActivationReply, RegistryError> {
        self.record(Call::Activate(id, active))?;
        if self.refuse_activation.load(Ordering::SeqCst) {
            return Ok(ActivationReply::from_body(
                json!({ "success": false, "message": "scheduler busy" }),
            ));
        }
        self.edit_versions(id, |versions, _| {
            for version in versions.iter_mut() {
                *version = version.with_active(version.id() == id && active);
            }
        });
        Ok(ActivationReply::from_body(json!({ "success": true })))
    }

    async fn reload_plugin(&self, package: &str) -> Result<Value, RegistryError> {
        self.record(Call::Reload(package.to_string()))?;
        Ok(json!({ "reloaded": package }))
    }
}

/// Log source backed by one channel per scope.
#[derive(Default)]
pub(crate) struct ChannelSource {
    feeds: Mutex<HashMap<Scope, UnboundedReceiver<Result<String, LogStreamError>>>>,
    subscribed: Mutex<Vec<Scope>>,
}

impl ChannelSource {
    pub(crate) fn open(&self, scope: Scope) -> UnboundedSender<Result<String, LogStreamError>> {
        let (tx, rx) = unbounded_channel();
        self.feeds.lock().unwrap().insert(scope, rx);
        tx
    }

    pub(crate) fn subscriptions(&self) -> Vec<Scope> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for ChannelSource {
    async fn subscribe(&self, scope: Scope) -> Result<LogFeed, LogStreamError> {
        self.subscribed.lock().unwrap().push(scope);
        let rx = self.feeds.lock().unwrap().remove(&scope).ok_or_else(|| {
            LogStreamError::Connect {
                url: scope.to_string(),
                reason: "connection refused".to_string(),
            }
        })?;
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })
        .boxed())
    }
}

pub(crate) fn frame(message: &str) -> Result<String, LogStreamError> {
    Ok(json!({ "level": "INFO", "message": message, "time": "t" }).to_string())
}

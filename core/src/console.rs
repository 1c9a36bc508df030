//! One operator session: the selected scope, its configuration and its logs.

use std::sync::Arc;

use futures_util::future;

use cadence_logstream::{LogSource, LogStreamClient};
use cadence_registry::Registry;
use cadence_types::{PluginId, Scope, SessionId};

use crate::controller::{ConfigController, Outcome};
use crate::errors::ScopedError;

/// Ties the configuration controller and the log client to one scope.
///
/// Selecting a scope tears down the previous log subscription, subscribes
/// for the new scope and loads its configuration. The two paths share
/// nothing but the scope key.
#[derive(Debug)]
pub struct Console {
    controller: ConfigController,
    logs: LogStreamClient,
    plugin: Option<PluginId>,
    session: SessionId,
}

impl Console {
    #[must_use]
    pub fn new(
        registry: Arc<dyn Registry>,
        source: Arc<dyn LogSource>,
        session: SessionId,
        max_messages: usize,
    ) -> Self {
        Self {
            controller: ConfigController::new(registry),
            logs: LogStreamClient::new(source, max_messages),
            plugin: None,
            session,
        }
    }

    /// The selected scope, once a plugin is chosen.
    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.plugin
            .map(|plugin| Scope::new(plugin, self.session))
    }

    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub async fn select_scope(&mut self, scope: Scope) -> Result<Outcome, ScopedError> {
        self.plugin = Some(scope.plugin);
        self.session = scope.session;
        tracing::debug!(scope = %scope, "Scope selected");

        let (_, loaded) = future::join(
            self.logs.set_scope(Some(scope)),
            self.controller.load(scope),
        )
        .await;
        loaded
    }

    pub async fn select_plugin(&mut self, plugin: PluginId) -> Result<Outcome, ScopedError> {
        self.select_scope(Scope::new(plugin, self.session)).await
    }

    /// Switch session. Without a selected plugin this only records the
    /// session for the next selection.
    pub async fn select_session(&mut self, session: SessionId) -> Result<Outcome, ScopedError> {
        match self.plugin {
            Some(plugin) => self.select_scope(Scope::new(plugin, session)).await,
            None => {
                self.session = session;
                Ok(Outcome::Applied)
            }
        }
    }

    /// Drop the selection: no configuration, no log subscription.
    pub async fn deselect(&mut self) {
        self.plugin = None;
        self.controller.unload();
        self.logs.set_scope(None).await;
    }

    #[must_use]
    pub fn controller(&self) -> &ConfigController {
        &self.controller
    }

    #[must_use]
    pub fn logs(&self) -> &LogStreamClient {
        &self.logs
    }

    pub fn logs_mut(&mut self) -> &mut LogStreamClient {
        &mut self.logs
    }

    /// Wait for the next log push of the selected scope. See
    /// [`LogStreamClient::recv`].
    pub async fn next_logs(&mut self) -> Option<usize> {
        self.logs.recv().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use cadence_logstream::StreamState;
    use cadence_types::{PluginId, SessionId};

    use super::Console;
    use crate::controller::Outcome;
    use crate::testing::{ChannelSource, FakeRegistry, frame, scope, version};

    fn console(registry: &Arc<FakeRegistry>, source: &Arc<ChannelSource>) -> Console {
        Console::new(registry.clone(), source.clone(), SessionId::new(1), 500)
    }

    #[tokio::test]
    async fn scope_change_moves_config_and_logs_together() {
        let registry = Arc::new(
            FakeRegistry::default()
                .with_scope(scope(1, 1), vec![version(1, true, json!({}))])
                .with_scope(scope(1, 2), vec![version(2, false, json!({}))]),
        );
        let source = Arc::new(ChannelSource::default());
        let first = source.open(scope(1, 1));
        let second = source.open(scope(1, 2));
        let mut console = console(&registry, &source);

        assert_eq!(console.select_plugin(PluginId::new(1)).await.unwrap(), Outcome::Applied);
        assert_eq!(console.scope(), Some(scope(1, 1)));
        for message in ["a", "b", "c"] {
            first.send(frame(message)).unwrap();
            console.next_logs().await;
        }
        assert_eq!(console.logs().len(), 3);

        console.select_session(SessionId::new(2)).await.unwrap();
        assert_eq!(console.controller().current().unwrap().scope(), scope(1, 2));
        assert!(console.logs().is_empty());
        assert_eq!(console.logs().next_seq(), 0);
        assert_eq!(console.logs().state(), &StreamState::Live(scope(1, 2)));

        second.send(frame("fresh")).unwrap();
        console.next_logs().await;
        let entry = console.logs().entries().next().unwrap();
        assert_eq!((entry.seq, entry.scope), (0, scope(1, 2)));
        assert_eq!(source.subscriptions(), [scope(1, 1), scope(1, 2)]);
    }

    #[tokio::test]
    async fn session_without_plugin_is_remembered() {
        let registry = Arc::new(
            FakeRegistry::default().with_scope(scope(3, 5), vec![version(1, false, json!({}))]),
        );
        let source = Arc::new(ChannelSource::default());
        let _feed = source.open(scope(3, 5));
        let mut console = console(&registry, &source);

        console.select_session(SessionId::new(5)).await.unwrap();
        assert!(console.scope().is_none());
        assert!(source.subscriptions().is_empty());

        console.select_plugin(PluginId::new(3)).await.unwrap();
        assert_eq!(console.scope(), Some(scope(3, 5)));
        assert!(console.logs().is_live());
    }

    #[tokio::test]
    async fn failed_log_subscription_does_not_block_config() {
        let registry = Arc::new(
            FakeRegistry::default().with_scope(scope(4, 1), vec![version(1, false, json!({}))]),
        );
        let source = Arc::new(ChannelSource::default());
        let mut console = console(&registry, &source);

        console.select_plugin(PluginId::new(4)).await.unwrap();
        assert!(console.controller().current().is_some());
        assert!(matches!(console.logs().state(), StreamState::Stopped { .. }));
    }

    #[tokio::test]
    async fn deselect_tears_everything_down() {
        let registry = Arc::new(
            FakeRegistry::default().with_scope(scope(1, 1), vec![version(1, false, json!({}))]),
        );
        let source = Arc::new(ChannelSource::default());
        let _feed = source.open(scope(1, 1));
        let mut console = console(&registry, &source);
        console.select_plugin(PluginId::new(1)).await.unwrap();

        console.deselect().await;
        assert!(console.scope().is_none());
        assert!(console.controller().current().is_none());
        assert_eq!(console.logs().state(), &StreamState::Idle);
        assert_eq!(console.next_logs().await, None);
    }
}

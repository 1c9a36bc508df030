//! Console flows over the real registry and log socket adapters.

use std::sync::Arc;

use serde_json::json;
use wiremock::MockServer;

use cadence_core::{Console, Outcome};
use cadence_logstream::{StopReason, StreamState, WebSocketSource, format_message};
use cadence_types::{LogLevel, PluginId, SessionId};

use crate::common::{LogServer, http_registry, mount_scope, record, scope};

#[tokio::test]
async fn selecting_a_plugin_loads_config_and_tails_logs() {
    let registry = MockServer::start().await;
    mount_scope(
        &registry,
        scope(3, 1),
        json!([{ "id": 5, "description": "nightly", "active": true, "config": "{}" }]),
    )
    .await;
    let logs = LogServer::start(vec![
        record("INFO", "started"),
        json!([
            record("WARNING", "slow run"),
            record("ERROR", "failed at datetime.datetime(2025, 12, 18, 10, 57)")
        ]),
    ])
    .await;
    let source = Arc::new(WebSocketSource::from_http_base(&logs.http_base()).unwrap());
    let mut console = Console::new(http_registry(&registry), source, SessionId::new(1), 500);

    let outcome = console.select_plugin(PluginId::new(3)).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(console.logs().state(), &StreamState::Live(scope(3, 1)));
    assert_eq!(
        console.controller().current().unwrap().selected_id().value(),
        5
    );

    assert_eq!(console.next_logs().await, Some(1));
    assert_eq!(console.next_logs().await, Some(2));
    let entries: Vec<_> = console.logs().entries().cloned().collect();
    assert_eq!(
        entries.iter().map(|entry| entry.seq).collect::<Vec<_>>(),
        [0, 1, 2]
    );
    assert_eq!(entries[1].level, LogLevel::Warning);
    assert_eq!(
        format_message(&entries[2].message),
        "failed at 2025-12-18 10:57:00"
    );

    assert_eq!(logs.close().await, "/ws/logs/3/1");
    assert_eq!(console.next_logs().await, None);
    assert!(matches!(
        console.logs().state(),
        StreamState::Stopped {
            reason: StopReason::Closed,
            ..
        }
    ));
    assert_eq!(console.logs().len(), 3);
}

#[tokio::test]
async fn buffer_keeps_only_the_newest_entries() {
    let registry = MockServer::start().await;
    mount_scope(&registry, scope(4, 2), json!([])).await;
    let logs = LogServer::start(vec![json!([
        record("INFO", "a"),
        record("INFO", "b"),
        record("INFO", "c")
    ])])
    .await;
    let source = Arc::new(WebSocketSource::from_http_base(&logs.http_base()).unwrap());
    let mut console = Console::new(http_registry(&registry), source, SessionId::new(2), 2);

    console.select_plugin(PluginId::new(4)).await.unwrap();
    console.next_logs().await;

    let kept: Vec<_> = console
        .logs()
        .entries()
        .map(|entry| (entry.seq, entry.message.clone()))
        .collect();
    assert_eq!(kept, [(1, "b".to_string()), (2, "c".to_string())]);
    logs.close().await;
}

#[tokio::test]
async fn unreachable_log_socket_leaves_config_usable() {
    let registry = MockServer::start().await;
    mount_scope(&registry, scope(3, 1), json!([])).await;
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let source = Arc::new(WebSocketSource::from_http_base(&format!("http://{addr}")).unwrap());
    let mut console = Console::new(http_registry(&registry), source, SessionId::new(1), 500);

    console.select_plugin(PluginId::new(3)).await.unwrap();

    assert!(console.controller().current().is_some());
    assert!(matches!(
        console.logs().state(),
        StreamState::Stopped {
            reason: StopReason::SubscribeFailed(_),
            ..
        }
    ));
    assert_eq!(console.next_logs().await, None);
}

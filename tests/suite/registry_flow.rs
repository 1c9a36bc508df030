//! Configuration flows through the HTTP registry adapter.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cadence_core::{ConfigController, ErrorKind, Outcome};
use cadence_types::{Payload, VersionId};

use crate::common::{http_registry, mount_scope, scope};

fn stored_rows() -> serde_json::Value {
    json!([
        { "id": 5, "description": "nightly", "active": 1, "config": "{\"models\": [\"alpha\"]}" },
        { "id": 6, "description": "weekly", "active": 0, "config": { "models": [] } }
    ])
}

#[tokio::test]
async fn load_selects_the_active_version() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    let controller = ConfigController::new(http_registry(&server));

    assert_eq!(controller.load(scope(3, 1)).await.unwrap(), Outcome::Applied);
    let state = controller.current().unwrap();
    assert_eq!(state.selected_id(), VersionId::new(5));
    assert_eq!(state.description(), "nightly");
    assert_eq!(state.stored().count(), 2);
    assert!(state.draft().is_draft());
    assert_eq!(
        state.hints().to_ui_schema()["models"]["ui:field"],
        json!("MultiSelect")
    );
}

#[tokio::test]
async fn save_updates_the_selection_and_reloads() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    Mock::given(method("POST"))
        .and(path("/config/6"))
        .and(body_json(json!({
            "config": { "models": ["beta"] },
            "description": "weekly run"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 6 })))
        .expect(1)
        .mount(&server)
        .await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 1)).await.unwrap();

    controller.select_version(VersionId::new(6)).unwrap();
    controller.set_description("weekly run").unwrap();
    let outcome = controller
        .save(&Payload::new(r#"{"models": ["beta"]}"#), "weekly run", false)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(controller.current().unwrap().selected_id(), VersionId::new(6));
}

#[tokio::test]
async fn saving_the_draft_creates_in_scope() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 2), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/config/0"))
        .and(body_json(json!({
            "config": { "models": [] },
            "description": "first",
            "userId": 2,
            "pluginId": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 11 })))
        .expect(1)
        .mount(&server)
        .await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 2)).await.unwrap();
    assert!(controller.current().unwrap().selected_id().is_draft());

    controller
        .save(&Payload::new(r#"{"models": []}"#), "first", false)
        .await
        .unwrap();
}

#[tokio::test]
async fn server_detail_reaches_the_operator() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    Mock::given(method("POST"))
        .and(path("/config/5"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "detail": [{ "msg": "models must not be empty" }] })),
        )
        .mount(&server)
        .await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 1)).await.unwrap();
    let before = controller.current().unwrap();

    let err = controller
        .save(&Payload::new(r#"{"models": []}"#), "nightly", false)
        .await
        .unwrap_err();

    assert_eq!(err.scope, Some(scope(3, 1)));
    assert_eq!(
        err.user_message(),
        "Request failed (422): models must not be empty"
    );
    assert!(std::sync::Arc::ptr_eq(&before, &controller.current().unwrap()));
}

#[tokio::test]
async fn activation_is_exclusive_locally() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    Mock::given(method("POST"))
        .and(path("/activate/6/true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 1)).await.unwrap();

    controller.activate(VersionId::new(6), true).await.unwrap();

    let state = controller.current().unwrap();
    assert_eq!(state.active().map(|v| v.id()), Some(VersionId::new(6)));
    assert_eq!(state.selected_id(), VersionId::new(6));
    assert!(!state.version(VersionId::new(5)).unwrap().is_active());
}

#[tokio::test]
async fn refused_activation_keeps_local_state() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    Mock::given(method("POST"))
        .and(path("/activate/6/true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "message": "scheduler busy" })),
        )
        .mount(&server)
        .await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 1)).await.unwrap();

    let err = controller
        .activate(VersionId::new(6), true)
        .await
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::ActivationRejected { .. }));
    assert_eq!(
        err.user_message(),
        "Activation of version 6 was refused: scheduler busy"
    );
    let state = controller.current().unwrap();
    assert_eq!(state.active().map(|v| v.id()), Some(VersionId::new(5)));
}

#[tokio::test]
async fn reload_plugin_resolves_the_package() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    Mock::given(method("GET"))
        .and(path("/plugins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "package": "plugins.sample@v0_2_0.Plugin", "interval": 60 }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/plugin/plugins.sample@v0_2_0.Plugin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 1)).await.unwrap();

    assert_eq!(controller.reload_plugin().await.unwrap(), Outcome::Applied);
    assert_eq!(controller.plugins().len(), 1);
}

#[tokio::test]
async fn missing_scope_is_reported_with_its_path() {
    let server = MockServer::start().await;
    let controller = ConfigController::new(http_registry(&server));

    let err = controller.load(scope(9, 1)).await.unwrap_err();
    assert_eq!(err.user_message(), "Not found: /schema/1/9");
    assert!(controller.current().is_none());
}

#[tokio::test]
async fn bound_editors_follow_the_hints() {
    let server = MockServer::start().await;
    mount_scope(&server, scope(3, 1), stored_rows()).await;
    let controller = ConfigController::new(http_registry(&server));
    controller.load(scope(3, 1)).await.unwrap();

    let editors = controller.current().unwrap().editors();
    assert_eq!(editors.len(), 1);
    assert_eq!(editors[0].path().join("."), "models");
}

//! Shared test utilities and fixtures
//!
//! A wiremock registry and an in-process log socket, so flows run against
//! the real HTTP and WebSocket adapters.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::SinkExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cadence_registry::retry::RetryConfig;
use cadence_registry::{HttpRegistry, HttpTimeouts};
use cadence_types::{PluginId, Scope, SessionId};

pub fn scope(plugin: u64, session: u64) -> Scope {
    Scope::new(PluginId::new(plugin), SessionId::new(session))
}

/// Schema with one multi-select field, the shape plugins usually ship.
pub fn models_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "models": {
                "type": "array",
                "ui:field": "MultiSelect",
                "items": { "enum": ["alpha", "beta"] }
            },
            "threshold": { "type": "number" }
        }
    })
}

/// Registry client against `server`, without read retries.
pub fn http_registry(server: &MockServer) -> Arc<HttpRegistry> {
    Arc::new(
        HttpRegistry::new(&server.uri(), HttpTimeouts::default())
            .unwrap()
            .with_retry(RetryConfig::once()),
    )
}

/// Serve `GET /schema/{session}/{plugin}` with `configs` as stored rows.
pub async fn mount_scope(server: &MockServer, scope: Scope, configs: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/schema/{}/{}", scope.session, scope.plugin)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schema": models_schema(),
            "configs": configs
        })))
        .mount(server)
        .await;
}

/// A log socket accepting one connection.
pub struct LogServer {
    pub addr: SocketAddr,
    close: Option<oneshot::Sender<()>>,
    handle: JoinHandle<String>,
}

impl LogServer {
    /// Send `frames` as text messages, then hold the socket open until
    /// [`LogServer::close`].
    pub async fn start(frames: Vec<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (close, closed) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut path = String::new();
            let record_path =
                |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    path = request.uri().path().to_string();
                    Ok(response)
                };
            let mut ws = accept_hdr_async(tcp, record_path).await.unwrap();
            for frame in frames {
                ws.send(Message::Text(frame.to_string().into())).await.unwrap();
            }
            let _ = closed.await;
            let _ = ws.close(None).await;
            path
        });

        Self {
            addr,
            close: Some(close),
            handle,
        }
    }

    pub fn http_base(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Close the socket and return the path the client connected to.
    pub async fn close(mut self) -> String {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        self.handle.await.unwrap()
    }
}

pub fn record(level: &str, message: &str) -> Value {
    json!({ "level": level, "message": message, "time": "2025-12-18 10:57:15" })
}

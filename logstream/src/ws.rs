//! WebSocket log source: `{ws-base}/ws/logs/{plugin}/{session}`.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, Stream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

use cadence_types::Scope;

use crate::LogStreamError;
use crate::source::{LogFeed, LogSource};

#[derive(Debug, Clone)]
pub struct WebSocketSource {
    base: Url,
}

impl WebSocketSource {
    /// `base` must be a `ws://` or `wss://` URL.
    pub fn new(base: &str) -> Result<Self, LogStreamError> {
        let invalid = |reason: &str| LogStreamError::InvalidUrl {
            url: base.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(base).map_err(|err| invalid(&err.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(invalid("scheme must be ws or wss"));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path"));
        }
        Ok(Self { base: url })
    }

    /// Derive the WebSocket base from the registry's HTTP base URL
    /// (`http` becomes `ws`, `https` becomes `wss`).
    pub fn from_http_base(base: &str) -> Result<Self, LogStreamError> {
        let invalid = |reason: &str| LogStreamError::InvalidUrl {
            url: base.to_string(),
            reason: reason.to_string(),
        };
        let mut url = Url::parse(base).map_err(|err| invalid(&err.to_string()))?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return Err(invalid("scheme must be http or https")),
        };
        url.set_scheme(scheme)
            .map_err(|()| invalid("scheme cannot be rewritten"))?;
        Self::new(url.as_str())
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, scope: Scope) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["ws", "logs"])
                .push(&scope.plugin.to_string())
                .push(&scope.session.to_string());
        }
        url
    }
}

#[async_trait]
impl LogSource for WebSocketSource {
    async fn subscribe(&self, scope: Scope) -> Result<LogFeed, LogStreamError> {
        let url = self.endpoint(scope);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|err| LogStreamError::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        tracing::debug!(scope = %scope, url = %url, "Log stream connected");
        Ok(into_feed(ws_stream))
    }
}

fn into_feed<S>(ws_stream: S) -> LogFeed
where
    S: Stream<Item = Result<Message, WsError>> + Send + Unpin + 'static,
{
    stream::unfold(Some(ws_stream), |state| async move {
        let mut ws_stream = state?;
        loop {
            match ws_stream.next().await? {
                Ok(Message::Close(_)) => return None,
                Ok(message) => {
                    if let Some(text) = websocket_message_to_text(message) {
                        return Some((Ok(text), Some(ws_stream)));
                    }
                }
                Err(err) => {
                    return Some((Err(LogStreamError::Transport(err.to_string())), None));
                }
            }
        }
    })
    .boxed()
}

fn websocket_message_to_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

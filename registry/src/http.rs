//! JSON-over-HTTP transport and the registry client built on it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use cadence_types::{PluginDescriptor, Scope, VersionId};

use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};
use crate::wire::{SchemaResponse, WireConfig};
use crate::{ActivationReply, MAX_ERROR_BODY_BYTES, Registry, RegistryError, ScopeSnapshot};

const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Transport timeouts. The console core imposes none of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    /// Whole-request deadline, body included.
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of an error response.
pub async fn read_capped_error_body(response: Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Base URL plus a configured client; shared by the registry and the
/// schedule-manager clients.
#[derive(Debug, Clone)]
pub(crate) struct JsonClient {
    client: reqwest::Client,
    base: Url,
}

impl JsonClient {
    pub(crate) fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidUrl {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };
        let base = Url::parse(base_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path"));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()
            .map_err(RegistryError::Client)?;

        Ok(Self { client, base })
    }

    pub(crate) fn base(&self) -> &Url {
        &self.base
    }

    /// Append path segments to the base URL. Each segment is percent-encoded
    /// as a unit, so ids and package names cannot inject extra path levels.
    pub(crate) fn url<I, S>(&self, segments: I) -> Result<Url, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RegistryError::InvalidUrl {
                    url: self.base.to_string(),
                    reason: "URL cannot carry a path".to_string(),
                })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        Ok(url)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        retry: &RetryConfig,
    ) -> Result<T, RegistryError> {
        let outcome = send_with_retry(|| self.client.get(url.clone()), retry).await;
        let response = into_success(outcome, &url).await?;
        let bytes = read_body(response).await?;
        serde_json::from_slice(&bytes).map_err(|source| RegistryError::Decode {
            path: url.path().to_string(),
            source,
        })
    }

    /// POST once. An empty success body reads as `null`.
    pub(crate) async fn post(
        &self,
        url: Url,
        body: Option<&Value>,
        authorization: Option<&str>,
    ) -> Result<Value, RegistryError> {
        let build = || {
            let mut request = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json");
            if let Some(key) = authorization {
                request = request.header(AUTHORIZATION, key);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request
        };
        let outcome = send_with_retry(build, &RetryConfig::once()).await;
        let response = into_success(outcome, &url).await?;
        let bytes = read_body(response).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|source| RegistryError::Decode {
            path: url.path().to_string(),
            source,
        })
    }
}

async fn into_success(outcome: RetryOutcome, url: &Url) -> Result<Response, RegistryError> {
    match outcome {
        RetryOutcome::Success(response) => Ok(response),
        RetryOutcome::HttpError(response) => {
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound {
                    path: url.path().to_string(),
                });
            }
            let body = read_capped_error_body(response).await;
            tracing::debug!(status = %status, path = url.path(), "Registry request failed");
            Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            })
        }
        RetryOutcome::ConnectionError { attempts, source } => {
            Err(RegistryError::Transport { attempts, source })
        }
    }
}

async fn read_body(response: Response) -> Result<Vec<u8>, RegistryError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| RegistryError::Transport {
            attempts: 1,
            source,
        })?;
    Ok(bytes.to_vec())
}

/// [`Registry`] over the console's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    http: JsonClient,
    retry: RetryConfig,
}

impl HttpRegistry {
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, RegistryError> {
        Ok(Self {
            http: JsonClient::new(base_url, timeouts)?,
            retry: RetryConfig::default(),
        })
    }

    /// Override the retry policy used for reads.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.http.base()
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, RegistryError> {
        let url = self.http.url(["plugins"])?;
        self.http.get(url, &self.retry).await
    }

    async fn fetch_scope(&self, scope: Scope) -> Result<ScopeSnapshot, RegistryError> {
        let url = self.http.url([
            "schema".to_string(),
            scope.session.to_string(),
            scope.plugin.to_string(),
        ])?;
        let response: SchemaResponse = self.http.get(url, &self.retry).await?;
        tracing::debug!(
            scope = %scope,
            versions = response.configs.len(),
            "Fetched scope"
        );
        Ok(ScopeSnapshot {
            schema: response.schema,
            versions: response
                .configs
                .into_iter()
                .map(WireConfig::into_version)
                .collect(),
        })
    }

    async fn create_version(
        &self,
        scope: Scope,
        config: &Value,
        description: &str,
    ) -> Result<Value, RegistryError> {
        let url = self.http.url(["config".to_string(), VersionId::DRAFT.to_string()])?;
        let body = json!({
            "config": config,
            "description": description,
            "userId": scope.session,
            "pluginId": scope.plugin,
        });
        self.http.post(url, Some(&body), None).await
    }

    async fn update_version(
        &self,
        id: VersionId,
        config: &Value,
        description: &str,
    ) -> Result<Value, RegistryError> {
        debug_assert!(!id.is_draft(), "the draft sentinel is never an update target");
        let url = self.http.url(["config".to_string(), id.to_string()])?;
        let body = json!({ "config": config, "description": description });
        self.http.post(url, Some(&body), None).await
    }

    async fn delete_version(&self, id: VersionId) -> Result<Value, RegistryError> {
        let url = self.http.url(["delete".to_string(), id.to_string()])?;
        self.http.post(url, None, None).await
    }

    async fn set_activation(
        &self,
        id: VersionId,
        active: bool,
    ) -> Result<ActivationReply, RegistryError> {
        let url = self
            .http
            .url(["activate".to_string(), id.to_string(), active.to_string()])?;
        let body = self.http.post(url, None, None).await?;
        Ok(ActivationReply::from_body(body))
    }

    async fn reload_plugin(&self, package: &str) -> Result<Value, RegistryError> {
        let url = self.http.url(["plugin", package])?;
        self.http.post(url, None, None).await
    }
}

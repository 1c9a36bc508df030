//! Schedule-manager client: scheduled jobs, pause/resume, and recent
//! scheduler events.

use serde::Deserialize;

use crate::http::{HttpTimeouts, JsonClient};
use crate::retry::RetryConfig;
use crate::RegistryError;

/// Default mount point of the schedule manager.
pub const DEFAULT_SCHEDULE_PATH: &str = "/schedule";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub name: String,
    /// ISO-8601; `None` while paused.
    #[serde(default)]
    pub next_run_time: Option<String>,
    #[serde(default)]
    pub paused: bool,
    /// ISO-8601 time of the last successful execution.
    #[serde(default)]
    pub last_execution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerEvent {
    pub id: u64,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_name: Option<String>,
    /// Scheduler event name, e.g. `EVENT_JOB_EXECUTED`.
    pub event_type: String,
    #[serde(default)]
    pub info: Option<String>,
    pub timestamp: String,
}

impl SchedulerEvent {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.event_type.as_str(), "EVENT_JOB_ERROR" | "EVENT_JOB_MISSED")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    Paused,
    Resumed,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<ScheduledJob>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<SchedulerEvent>,
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    state: ToggleState,
}

/// Client for the schedule manager mounted under `path` on the API host.
#[derive(Clone)]
pub struct ScheduleClient {
    http: JsonClient,
    segments: Vec<String>,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl std::fmt::Debug for ScheduleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleClient")
            .field("base", &self.http.base().as_str())
            .field("segments", &self.segments)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .finish_non_exhaustive()
    }
}

impl ScheduleClient {
    pub fn new(
        base_url: &str,
        path: &str,
        api_key: Option<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            http: JsonClient::new(base_url, timeouts)?,
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string)
                .collect(),
            api_key: api_key.filter(|key| !key.is_empty()),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, tail: &[&str]) -> Result<url::Url, RegistryError> {
        self.http.url(
            self.segments
                .iter()
                .map(String::as_str)
                .chain(tail.iter().copied()),
        )
    }

    /// Scheduled jobs, sorted by id server-side.
    pub async fn jobs(&self) -> Result<Vec<ScheduledJob>, RegistryError> {
        let response: JobsResponse = self.http.get(self.url(&[])?, &self.retry).await?;
        Ok(response.jobs)
    }

    /// Pause a running job or resume a paused one.
    pub async fn toggle(&self, job_id: &str) -> Result<ToggleState, RegistryError> {
        let url = self.url(&["toggle", job_id])?;
        let body = self.http.post(url, None, self.api_key.as_deref()).await?;
        let response: ToggleResponse =
            serde_json::from_value(body).map_err(|source| RegistryError::Decode {
                path: format!("toggle/{job_id}"),
                source,
            })?;
        tracing::info!(job = job_id, state = ?response.state, "Scheduled job toggled");
        Ok(response.state)
    }

    /// Most recent scheduler events, newest first (the manager keeps 500).
    pub async fn events(&self) -> Result<Vec<SchedulerEvent>, RegistryError> {
        let response: EventsResponse = self.http.get(self.url(&["logs"])?, &self.retry).await?;
        Ok(response.events)
    }
}

//! Subcommand handlers.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow, bail};

use cadence_config::CadenceConfig;
use cadence_core::errors::describe_registry_error;
use cadence_core::{ConfigController, Console, Outcome, ScopedError};
use cadence_logstream::{StopReason, StreamState, WebSocketSource, format_message};
use cadence_registry::{
    HttpRegistry, HttpTimeouts, RegistryError, ScheduleClient, ScheduledJob, SchedulerEvent,
    ToggleState,
};
use cadence_types::{LogEntry, Payload, PluginId, Scope, SessionId, VersionId};

use crate::args::{Commands, ScheduleCommands, Target};

/// Adapters built from the configuration, shared by every subcommand.
pub struct Context {
    config: CadenceConfig,
    base_url: String,
    registry: Arc<HttpRegistry>,
    source: Arc<WebSocketSource>,
}

impl Context {
    pub fn new(base_url_override: Option<&str>, config: CadenceConfig) -> Result<Self> {
        let base_url = base_url_override
            .map(ToString::to_string)
            .unwrap_or_else(|| config.base_url());
        let registry = HttpRegistry::new(&base_url, timeouts(&config))
            .with_context(|| format!("invalid registry URL {base_url:?}"))?;

        // An explicit --base-url wins over a configured socket base.
        let source = match config.ws_base_url().filter(|_| base_url_override.is_none()) {
            Some(ws_base) => WebSocketSource::new(&ws_base),
            None => WebSocketSource::from_http_base(&base_url),
        }
        .context("invalid log stream URL")?;

        tracing::debug!(
            base_url = %base_url,
            ws_base = %source.base_url(),
            "Adapters configured"
        );
        Ok(Self {
            config,
            base_url,
            registry: Arc::new(registry),
            source: Arc::new(source),
        })
    }

    fn scope(&self, target: Target) -> Scope {
        let session = target
            .session
            .unwrap_or_else(|| self.config.default_session());
        Scope::new(PluginId::new(target.plugin), SessionId::new(session))
    }

    fn controller(&self) -> ConfigController {
        ConfigController::new(self.registry.clone())
    }

    fn schedule(&self) -> Result<ScheduleClient> {
        ScheduleClient::new(
            &self.base_url,
            &self.config.schedule_path(),
            self.config.schedule_api_key(),
            timeouts(&self.config),
        )
        .map_err(|err| anyhow!(describe_registry_error(&err)))
    }
}

fn timeouts(config: &CadenceConfig) -> HttpTimeouts {
    HttpTimeouts {
        connect: config.connect_timeout(),
        request: config.request_timeout(),
    }
}

fn user_error(err: ScopedError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn registry_error(err: RegistryError) -> anyhow::Error {
    anyhow!(describe_registry_error(&err))
}

/// A one-shot command never switches scope mid-flight, so a stale outcome
/// means something else retargeted the controller.
fn applied(outcome: Result<Outcome, ScopedError>) -> Result<()> {
    match outcome.map_err(user_error)? {
        Outcome::Applied => Ok(()),
        Outcome::Stale => bail!("The selection changed before the response arrived"),
    }
}

pub async fn run(context: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Plugins => plugins(context).await,
        Commands::Versions { target } => versions(context, target).await,
        Commands::Hints { target } => hints(context, target).await,
        Commands::Save {
            target,
            payload,
            description,
            version,
            new,
        } => save(context, target, &payload, description, version, new).await,
        Commands::Activate { target, version } => {
            set_activation(context, target, version, true).await
        }
        Commands::Deactivate { target, version } => {
            set_activation(context, target, version, false).await
        }
        Commands::Delete { target, version } => delete(context, target, version).await,
        Commands::Reload { target } => reload(context, target).await,
        Commands::Logs { target, max } => logs(context, target, max).await,
        Commands::Schedule(command) => schedule(context, command).await,
    }
}

async fn plugins(context: &Context) -> Result<()> {
    let controller = context.controller();
    applied(controller.refresh_plugins().await)?;

    let mut out = io::stdout().lock();
    for plugin in controller.plugins().iter() {
        writeln!(
            out,
            "{:>4}  {:<32} every {}s  {}",
            plugin.id.value(),
            plugin.package,
            plugin.interval,
            plugin.description.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

async fn load(context: &Context, target: Target) -> Result<ConfigController> {
    let controller = context.controller();
    applied(controller.load(context.scope(target)).await)?;
    Ok(controller)
}

async fn versions(context: &Context, target: Target) -> Result<()> {
    let controller = load(context, target).await?;
    let state = controller
        .current()
        .ok_or_else(|| anyhow!("No configuration loaded"))?;

    let mut out = io::stdout().lock();
    writeln!(out, "{}", state.scope())?;
    for version in state.versions() {
        let marker = match (version.id() == state.selected_id(), version.is_active()) {
            (_, true) => '*',
            (true, false) => '>',
            _ => ' ',
        };
        if version.is_draft() {
            writeln!(out, "{marker} {:>4}  (new configuration)", version.id().value())?;
        } else {
            writeln!(out, "{marker} {:>4}  {}", version.id().value(), version.label())?;
        }
    }
    Ok(())
}

async fn hints(context: &Context, target: Target) -> Result<()> {
    let controller = load(context, target).await?;
    let state = controller
        .current()
        .ok_or_else(|| anyhow!("No configuration loaded"))?;

    let ui_schema = state.hints().to_ui_schema();
    println!("{}", serde_json::to_string_pretty(&ui_schema)?);
    for editor in state.editors() {
        tracing::debug!(widget = ?editor.widget(), path = ?editor.path(), "Editor bound");
    }
    Ok(())
}

fn read_payload(path: &Path) -> Result<Payload> {
    let text = if path == Path::new("-") {
        io::read_to_string(io::stdin()).context("failed to read payload from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?
    };
    Ok(Payload::new(text))
}

async fn save(
    context: &Context,
    target: Target,
    payload: &Path,
    description: Option<String>,
    version: Option<u64>,
    new: bool,
) -> Result<()> {
    let payload = read_payload(payload)?;
    let controller = load(context, target).await?;

    if let Some(id) = version.map(VersionId::new) {
        let known = controller
            .current()
            .is_some_and(|state| state.version(id).is_some());
        if !known {
            bail!("Unknown version {id}");
        }
        applied(controller.select_version(id))?;
    }
    if let Some(description) = description.as_deref() {
        applied(controller.set_description(description))?;
    }

    let description = controller
        .current()
        .map(|state| state.description().to_string())
        .unwrap_or_default();
    applied(controller.save(&payload, &description, new).await)?;

    if let Some(state) = controller.current() {
        println!(
            "Saved {} ({} stored version(s))",
            state.scope(),
            state.stored().count()
        );
    }
    Ok(())
}

async fn set_activation(
    context: &Context,
    target: Target,
    version: u64,
    active: bool,
) -> Result<()> {
    let controller = load(context, target).await?;
    let id = VersionId::new(version);
    applied(controller.activate(id, active).await)?;

    let verb = if active { "Activated" } else { "Deactivated" };
    println!("{verb} version {id} of {}", context.scope(target));
    Ok(())
}

async fn delete(context: &Context, target: Target, version: u64) -> Result<()> {
    let controller = load(context, target).await?;
    let id = VersionId::new(version);
    applied(controller.delete(id).await)?;
    println!("Deleted version {id}");
    Ok(())
}

async fn reload(context: &Context, target: Target) -> Result<()> {
    let controller = load(context, target).await?;
    applied(controller.reload_plugin().await)?;
    println!("Reloaded plugin {}", target.plugin);
    Ok(())
}

/// `TIMESTAMP LEVEL message [source]`, with datetime reprs rendered.
pub(crate) fn render_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {:<8} {}",
        entry.timestamp,
        entry.level.as_str(),
        format_message(&entry.message)
    );
    if let Some(source) = entry.source.as_deref() {
        line.push_str(" [");
        line.push_str(source);
        line.push(']');
    }
    line
}

async fn logs(context: &Context, target: Target, max: Option<usize>) -> Result<()> {
    let max = max.unwrap_or_else(|| context.config.max_messages());
    let mut console = Console::new(
        context.registry.clone(),
        context.source.clone(),
        SessionId::new(target.session.unwrap_or_else(|| context.config.default_session())),
        max,
    );

    // A config failure is worth reporting but does not stop the tail.
    if let Err(err) = console.select_plugin(PluginId::new(target.plugin)).await {
        eprintln!("warning: {}", err.user_message());
    }
    if let Some(active) = console
        .controller()
        .current()
        .and_then(|state| state.active().map(|v| v.label().to_string()))
    {
        eprintln!("Active configuration: {active}");
    }

    let mut printed = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            pushed = console.next_logs() => {
                let mut out = io::stdout().lock();
                for entry in console.logs().entries().filter(|entry| entry.seq >= printed) {
                    writeln!(out, "{}", render_entry(entry))?;
                }
                printed = console.logs().next_seq();
                if pushed.is_none() {
                    break;
                }
            }
        }
    }

    match console.logs().state() {
        StreamState::Stopped {
            reason: StopReason::Closed,
            ..
        } => eprintln!("Log stream closed by the server"),
        StreamState::Stopped { reason, .. } => bail!("Log stream stopped: {reason:?}"),
        StreamState::Idle | StreamState::Live(_) => {}
    }
    Ok(())
}

fn render_job(job: &ScheduledJob) -> String {
    let next = if job.paused {
        "paused"
    } else {
        job.next_run_time.as_deref().unwrap_or("-")
    };
    format!(
        "{:<24} {:<32} next: {:<26} last: {}",
        job.id,
        job.name,
        next,
        job.last_execution.as_deref().unwrap_or("-")
    )
}

fn render_event(event: &SchedulerEvent) -> String {
    let job = event
        .job_name
        .as_deref()
        .or(event.job_id.as_deref())
        .unwrap_or("-");
    let mut line = format!("{} {:<20} {job}", event.timestamp, event.event_type);
    if let Some(info) = event.info.as_deref().filter(|info| !info.is_empty()) {
        line.push_str(": ");
        line.push_str(info);
    }
    line
}

async fn schedule(context: &Context, command: ScheduleCommands) -> Result<()> {
    let client = context.schedule()?;
    let mut out = io::stdout().lock();
    match command {
        ScheduleCommands::List => {
            for job in client.jobs().await.map_err(registry_error)? {
                writeln!(out, "{}", render_job(&job))?;
            }
        }
        ScheduleCommands::Toggle { job_id } => {
            let state = client.toggle(&job_id).await.map_err(registry_error)?;
            let verb = match state {
                ToggleState::Paused => "Paused",
                ToggleState::Resumed => "Resumed",
            };
            writeln!(out, "{verb} {job_id}")?;
        }
        ScheduleCommands::Events { errors } => {
            let events = client.events().await.map_err(registry_error)?;
            for event in events.iter().filter(|event| !errors || event.is_error()) {
                writeln!(out, "{}", render_event(event))?;
            }
        }
    }
    Ok(())
}

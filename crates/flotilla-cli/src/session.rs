//! Per-invocation wiring: configuration, project, runtime, prompt,
//! progress renderer, and Ctrl+C handling.

use std::io::Stderr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use flotilla_common::config::FlotillaConfig;
use flotilla_compose::progress;
use flotilla_compose::project::Project;
use flotilla_compose::prompt::LinePrompt;
use flotilla_compose::service::ComposeService;
use flotilla_runtime::backend::RuntimeClient;
use flotilla_runtime::backend::local::LocalRuntime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::commands::GlobalArgs;

/// Everything a subcommand needs to run.
pub struct Session {
    /// Project whose containers are targeted.
    pub project_name: String,
    /// Project definition, when one was given.
    pub project: Option<Project>,
    /// Lifecycle service bound to the local runtime.
    pub service: ComposeService,
    renderer: JoinHandle<Stderr>,
}

impl Session {
    /// Resolves configuration and project, and starts the progress renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or project file is invalid, the
    /// project name cannot be determined, or the Ctrl+C handler cannot be
    /// installed.
    pub fn open(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = load_config(global)?;
        let project = global
            .project_file
            .as_deref()
            .map(load_project)
            .transpose()?;
        let project_name = resolve_project_name(
            global.project_name.as_deref(),
            project.as_ref(),
            &std::env::current_dir()?,
        )?;
        tracing::debug!(
            project = %project_name,
            state_file = %config.state_file.display(),
            dry_run = global.dry_run,
            "session opened"
        );

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("interrupted, cancelling pending operations");
            on_interrupt.cancel();
        })
        .context("failed to set Ctrl+C handler")?;

        let (sink, rx) = progress::channel();
        let renderer = progress::spawn_renderer(rx, std::io::stderr());

        let client: Arc<dyn RuntimeClient> = Arc::new(LocalRuntime::new(&config.state_file));
        let service = ComposeService::new(client)
            .with_config(&config)
            .with_prompt(Arc::new(LinePrompt::stdio()))
            .with_progress(Arc::new(sink))
            .with_cancellation(cancel)
            .with_dry_run(global.dry_run);

        Ok(Self {
            project_name,
            project,
            service,
            renderer,
        })
    }

    /// Wraps an already configured service, without config files, signal
    /// handling, or progress output.
    #[cfg(test)]
    pub fn with_service(project_name: &str, service: ComposeService) -> Self {
        let (_sink, rx) = progress::channel();
        Self {
            project_name: project_name.to_string(),
            project: None,
            service,
            renderer: progress::spawn_renderer(rx, std::io::stderr()),
        }
    }

    /// Shuts the progress channel down and waits for the renderer to drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer task panicked.
    pub async fn close(self) -> anyhow::Result<()> {
        let Self {
            service, renderer, ..
        } = self;
        drop(service);
        let _ = renderer
            .await
            .context("progress renderer failed")?;
        Ok(())
    }
}

/// Layers defaults, the optional config file, environment overrides, and
/// command-line flags.
fn load_config(global: &GlobalArgs) -> anyhow::Result<FlotillaConfig> {
    let config = match &global.config {
        Some(path) => FlotillaConfig::from_file(path)?,
        None => FlotillaConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(state_file) = &global.state_file {
        config.state_file.clone_from(state_file);
    }
    Ok(config)
}

fn load_project(path: &Path) -> anyhow::Result<Project> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read project file {}", path.display()))?;
    let project: Project = serde_json::from_str(&content)
        .with_context(|| format!("invalid project file {}", path.display()))?;
    // Catch undefined dependencies and cycles before touching containers.
    let _ = project.dependency_graph()?;
    Ok(project)
}

/// Picks the explicit name, then the project definition's, then the
/// current directory's.
fn resolve_project_name(
    explicit: Option<&str>,
    project: Option<&Project>,
    cwd: &Path,
) -> anyhow::Result<String> {
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        return Ok(name.trim().to_lowercase());
    }
    if let Some(project) = project {
        return Ok(project.name.to_string());
    }
    cwd.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| anyhow::anyhow!("cannot derive a project name from {}", cwd.display()))
}

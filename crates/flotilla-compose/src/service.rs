//! The lifecycle service: wiring between the runtime client, the
//! confirmation gate, the progress sink, and the executor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use flotilla_common::config::FlotillaConfig;
use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ProjectName;
use flotilla_runtime::backend::dry_run::DryRunClient;
use flotilla_runtime::backend::{ContainerDetails, ContainerSummary, RuntimeClient};
use tokio_util::sync::CancellationToken;

use crate::containers::{self, Containers};
use crate::directory::{self, OneOff, Query};
use crate::executor::{Executor, FailurePolicy};
use crate::progress::{self, EventLabels, ProgressSink, TracingSink};
use crate::project::Project;
use crate::prompt::{AutoConfirm, Confirm};
use crate::reconcile::{self, Reconciled};

/// Runs bulk lifecycle operations against a container runtime.
pub struct ComposeService {
    pub(crate) client: Arc<dyn RuntimeClient>,
    pub(crate) prompt: Arc<dyn Confirm>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) policy: FailurePolicy,
    pub(crate) dry_run: bool,
    pub(crate) confirm_default: bool,
    pub(crate) stop_timeout: Option<Duration>,
    pub(crate) cancel: CancellationToken,
}

impl ComposeService {
    /// Creates a service with fail-fast execution, progress logged through
    /// `tracing`, and every confirmation declined.
    #[must_use]
    pub fn new(client: Arc<dyn RuntimeClient>) -> Self {
        Self {
            client,
            prompt: Arc::new(AutoConfirm(false)),
            progress: Arc::new(TracingSink),
            policy: FailurePolicy::FailFast,
            dry_run: false,
            confirm_default: false,
            stop_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Applies the execution settings of `config`.
    #[must_use]
    pub fn with_config(mut self, config: &FlotillaConfig) -> Self {
        self.policy = if config.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        };
        self.confirm_default = config.confirm_default;
        self.stop_timeout = Some(config.stop_timeout());
        self
    }

    /// Sets the confirmation gate.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn Confirm>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the executor failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the root cancellation token every call derives from.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enables dry-run mode: mutations are reported but never reach the runtime.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        if dry_run && !self.dry_run {
            self.client = Arc::new(DryRunClient::new(self.client));
        }
        self.dry_run = dry_run || self.dry_run;
        self
    }

    /// Returns `true` in dry-run mode.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub(crate) fn executor(&self, labels: EventLabels) -> Executor {
        Executor::new(Arc::clone(&self.progress), labels, self.policy)
    }

    /// Directory query followed by the selection filter. `None` when the
    /// project has no matching containers at all.
    pub(crate) async fn candidates(
        &self,
        project_name: &ProjectName,
        query: &Query,
        project: Option<&Project>,
    ) -> Result<Option<Containers>> {
        let Some(found) =
            directory::find(self.client.as_ref(), project_name, query, &self.cancel).await?
        else {
            return Ok(None);
        };
        Ok(Some(match project {
            Some(project) => containers::select(found, &project.service_names()),
            None => found,
        }))
    }

    /// Asks the confirmation gate once pending progress has been displayed.
    /// The gate may block on terminal input, so it runs off the async workers.
    pub(crate) async fn confirm(&self, message: String) -> Result<bool> {
        self.progress.flush().await;
        let prompt = Arc::clone(&self.prompt);
        let default = self.confirm_default;
        tokio::task::spawn_blocking(move || prompt.confirm(&message, default))
            .await
            .map_err(|e| FlotillaError::Runtime {
                message: format!("confirmation prompt terminated abnormally: {e}"),
            })?
    }

    pub(crate) async fn reconcile(
        &self,
        candidates: Containers,
        precondition: impl Fn(&ContainerDetails) -> bool,
    ) -> Result<Reconciled> {
        reconcile::reconcile(self.client.as_ref(), candidates, precondition, &self.cancel).await
    }

    /// Runs a mutation over `containers` under a progress title.
    pub(crate) async fn apply<F, Fut>(
        &self,
        containers: &Containers,
        labels: EventLabels,
        mutation: F,
    ) -> Result<()>
    where
        F: Fn(Arc<dyn RuntimeClient>, ContainerSummary, CancellationToken) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let executor = self.executor(labels);
        let client = Arc::clone(&self.client);
        progress::run_with_title(self.progress.as_ref(), labels.title, async {
            executor
                .execute(containers, &self.cancel, move |c, token| {
                    mutation(Arc::clone(&client), c, token)
                })
                .await
                .into_result()
        })
        .await
    }

    /// Shared flow of operations without confirmation: directory, filter,
    /// reconcile, then execute over whatever satisfies `precondition`.
    pub(crate) async fn run_simple<P, F, Fut>(&self, plan: SimplePlan<'_>, precondition: P, mutation: F) -> Result<()>
    where
        P: Fn(&ContainerDetails) -> bool,
        F: Fn(Arc<dyn RuntimeClient>, ContainerSummary, CancellationToken) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let project_name = ProjectName::new(plan.project_name);
        let query = Query {
            oneoff: OneOff::Exclude,
            require_running: plan.require_running,
            services: plan.services.to_vec(),
        };
        let Some(candidates) = self.candidates(&project_name, &query, plan.project).await? else {
            self.progress.notice(plan.nothing_to_do);
            return Ok(());
        };
        let reconciled = self.reconcile(candidates, precondition).await?;
        if reconciled.actionable.is_empty() {
            self.progress.notice(plan.nothing_to_do);
            return Ok(());
        }
        tracing::info!(
            project = %project_name,
            containers = reconciled.actionable.len(),
            "{}",
            plan.labels.title
        );
        self.apply(&reconciled.actionable, plan.labels, mutation).await
    }
}

/// Parameters of [`ComposeService::run_simple`].
pub(crate) struct SimplePlan<'a> {
    pub(crate) project_name: &'a str,
    pub(crate) services: &'a [String],
    pub(crate) project: Option<&'a Project>,
    pub(crate) require_running: bool,
    pub(crate) labels: EventLabels,
    pub(crate) nothing_to_do: &'static str,
}

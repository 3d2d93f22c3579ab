//! Concurrent executor for bulk mutations.
//!
//! One task per container, all launched at once and joined at the end.
//! Per-container failures are isolated: every launched task runs to
//! completion and gets its own [`Outcome`]. Under [`FailurePolicy::FailFast`]
//! the first failure cancels the group token, so tasks that have not yet
//! reached their mutation call are skipped; calls already in flight only
//! stop early if they honour the token themselves.
//!
//! The aggregate error is chosen by launch order, never by completion
//! order, so the same inputs always report the same failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ContainerId;
use flotilla_runtime::backend::ContainerSummary;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::containers::{Containers, canonical_name, progress_name};
use crate::progress::{EventLabels, ProgressEvent, ProgressSink};

/// What happens to not-yet-started work after a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Cancel the group on the first failure.
    #[default]
    FailFast,
    /// Let every task attempt its mutation.
    Continue,
}

/// Result of the mutation on one container.
#[derive(Debug)]
pub enum Outcome {
    /// The mutation succeeded.
    Succeeded,
    /// The container no longer existed; counted as success.
    AlreadyGone,
    /// The group was cancelled before the mutation started.
    Skipped,
    /// The mutation observed cancellation and gave up.
    Cancelled,
    /// The mutation failed.
    Failed(FlotillaError),
}

impl Outcome {
    /// Returns `true` for outcomes that do not fail the operation.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::AlreadyGone)
    }
}

/// Per-container outcomes of one execution, in launch order.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// `(container, outcome)` pairs in launch order.
    pub outcomes: Vec<(ContainerId, Outcome)>,
}

impl ExecutionReport {
    /// Returns how many containers reached a successful outcome.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    /// Returns the first failure in launch order.
    #[must_use]
    pub fn first_error(&self) -> Option<&FlotillaError> {
        self.outcomes.iter().find_map(|(_, o)| match o {
            Outcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    /// Collapses the report into the aggregate result.
    ///
    /// # Errors
    ///
    /// Returns the first failure in launch order. Without failures, returns
    /// `Cancelled` if any container was skipped or cancelled.
    pub fn into_result(self) -> Result<()> {
        let mut interrupted = false;
        for (_, outcome) in self.outcomes {
            match outcome {
                Outcome::Failed(e) => return Err(e),
                Outcome::Skipped | Outcome::Cancelled => interrupted = true,
                Outcome::Succeeded | Outcome::AlreadyGone => {}
            }
        }
        if interrupted {
            return Err(FlotillaError::Cancelled);
        }
        Ok(())
    }
}

/// Runs one mutation per container concurrently.
pub struct Executor {
    sink: Arc<dyn ProgressSink>,
    labels: EventLabels,
    policy: FailurePolicy,
}

impl Executor {
    /// Creates an executor reporting to `sink` with `labels`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>, labels: EventLabels, policy: FailurePolicy) -> Self {
        Self {
            sink,
            labels,
            policy,
        }
    }

    /// Applies `mutation` to every container and waits for all of them.
    ///
    /// `mutation` receives the container and the group's cancellation
    /// token. A `NotFound` result is recorded as [`Outcome::AlreadyGone`].
    pub async fn execute<F, Fut>(
        &self,
        containers: &Containers,
        parent: &CancellationToken,
        mutation: F,
    ) -> ExecutionReport
    where
        F: Fn(ContainerSummary, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let group = parent.child_token();
        let mutation = Arc::new(mutation);
        let mut set = JoinSet::new();
        let mut launched: HashMap<task::Id, usize> = HashMap::new();

        for (index, container) in containers.iter().cloned().enumerate() {
            let task = Task {
                index,
                container,
                token: group.clone(),
                sink: Arc::clone(&self.sink),
                labels: self.labels,
                fail_fast: self.policy == FailurePolicy::FailFast,
            };
            let mutation = Arc::clone(&mutation);
            let handle = set.spawn(task.run(move |c, token| mutation(c, token)));
            let _ = launched.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<Outcome>> = std::iter::repeat_with(|| None)
            .take(containers.len())
            .collect();
        let mut aborted: HashMap<usize, String> = HashMap::new();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, (index, outcome))) => slots[index] = Some(outcome),
                Err(e) => match launched.get(&e.id()) {
                    Some(&index) => {
                        let _ = aborted.insert(index, e.to_string());
                    }
                    None => tracing::error!(error = %e, "unknown task terminated abnormally"),
                },
            }
        }

        let outcomes = containers
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (container, slot))| {
                let outcome = slot.unwrap_or_else(|| {
                    Outcome::Failed(mutation_error(
                        container,
                        FlotillaError::Runtime {
                            message: format!(
                                "task terminated abnormally: {}",
                                aborted.remove(&index).unwrap_or_default()
                            ),
                        },
                    ))
                });
                (container.id.clone(), outcome)
            })
            .collect();
        ExecutionReport { outcomes }
    }
}

struct Task {
    index: usize,
    container: ContainerSummary,
    token: CancellationToken,
    sink: Arc<dyn ProgressSink>,
    labels: EventLabels,
    fail_fast: bool,
}

impl Task {
    async fn run<F, Fut>(self, mutation: F) -> (usize, Outcome)
    where
        F: FnOnce(ContainerSummary, CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let Self {
            index,
            container,
            token,
            sink,
            labels,
            fail_fast,
        } = self;

        if token.is_cancelled() {
            tracing::debug!(id = %container.id, "cancelled before start");
            return (index, Outcome::Skipped);
        }

        let item = progress_name(&container);
        sink.emit(ProgressEvent::starting(&item, labels.working));

        let outcome = match mutation(container.clone(), token.clone()).await {
            Ok(()) => {
                sink.emit(ProgressEvent::completed(&item, labels.done));
                Outcome::Succeeded
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %container.id, "container already gone");
                sink.emit(ProgressEvent::completed(&item, labels.done));
                Outcome::AlreadyGone
            }
            Err(e) if e.is_cancelled() => {
                sink.emit(ProgressEvent::failed(&item, &e));
                Outcome::Cancelled
            }
            Err(e) => {
                tracing::error!(id = %container.id, error = %e, "{} failed", labels.working);
                sink.emit(ProgressEvent::failed(&item, &e));
                if fail_fast {
                    token.cancel();
                }
                Outcome::Failed(mutation_error(&container, e))
            }
        };
        (index, outcome)
    }
}

fn mutation_error(container: &ContainerSummary, source: FlotillaError) -> FlotillaError {
    FlotillaError::Mutation {
        id: container.id.to_string(),
        name: canonical_name(container),
        source: Box::new(source),
    }
}

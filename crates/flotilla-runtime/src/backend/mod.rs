//! Runtime client abstraction consumed by the lifecycle engine.

pub mod dry_run;
pub mod local;
pub mod memory;

use std::collections::BTreeMap;
use std::time::Duration;

use flotilla_common::constants::{ONEOFF_LABEL, PROJECT_LABEL, SERVICE_LABEL};
use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::{ContainerId, ContainerState};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// A container as reported by a listing call.
///
/// Listing results are a snapshot: by the time a caller acts on one, the
/// runtime may have moved the container to another state or removed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Runtime identifier.
    pub id: ContainerId,
    /// Names known to the runtime, conventionally prefixed with `/`.
    pub names: Vec<String>,
    /// Container labels.
    pub labels: BTreeMap<String, String>,
    /// State at listing time.
    pub state: ContainerState,
    /// Image reference.
    pub image: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl ContainerSummary {
    /// Returns the value of a label, if set.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Returns the project this container belongs to.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.label(PROJECT_LABEL)
    }

    /// Returns the service this container belongs to.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.label(SERVICE_LABEL)
    }

    /// Returns `true` for ad-hoc containers outside a service's replica set.
    #[must_use]
    pub fn is_oneoff(&self) -> bool {
        self.label(ONEOFF_LABEL) == Some("True")
    }
}

/// Live state returned by an inspection call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Runtime identifier.
    pub id: ContainerId,
    /// Primary name.
    pub name: String,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Container labels.
    pub labels: BTreeMap<String, String>,
}

impl ContainerDetails {
    /// Returns `true` while the container has live processes, paused or not.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.is_active()
    }

    /// Returns `true` if the container is frozen.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == ContainerState::Paused
    }
}

/// A single label constraint in a listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    /// Label key.
    pub key: String,
    /// Required value; `None` only requires the label to be present.
    pub value: Option<String>,
}

impl LabelFilter {
    /// Requires `key` to equal `value`.
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Requires `key` to be present.
    #[must_use]
    pub fn present(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Listing query: label constraints, grouped by key.
///
/// Constraints on the same key are alternatives; constraints on different
/// keys must all hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Label constraints.
    pub labels: Vec<LabelFilter>,
    /// Include containers that are not running.
    pub all: bool,
}

impl ListFilter {
    /// Returns `true` if the summary satisfies this query.
    #[must_use]
    pub fn matches(&self, container: &ContainerSummary) -> bool {
        if !self.all && !container.state.is_active() {
            return false;
        }
        let mut by_key: BTreeMap<&str, Vec<&LabelFilter>> = BTreeMap::new();
        for filter in &self.labels {
            by_key.entry(filter.key.as_str()).or_default().push(filter);
        }
        by_key.into_iter().all(|(key, alternatives)| {
            container.label(key).is_some_and(|actual| {
                alternatives
                    .iter()
                    .any(|f| f.value.as_deref().is_none_or(|v| v == actual))
            })
        })
    }
}

/// Options for the removal call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveContainerOptions {
    /// Also remove anonymous volumes attached to the container.
    pub volumes: bool,
    /// Remove even if the container is running.
    pub force: bool,
}

/// Container runtime API consumed by the lifecycle engine.
///
/// Implementations must be safe to call concurrently. Every call receives a
/// cancellation token which it honours cooperatively: a call that begins
/// after cancellation returns [`FlotillaError::Cancelled`], a call already
/// in flight is allowed to finish.
#[async_trait::async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Lists containers matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    async fn list(
        &self,
        filter: &ListFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>>;

    /// Inspects the live state of a container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container no longer exists.
    async fn inspect(&self, id: &ContainerId, cancel: &CancellationToken)
    -> Result<ContainerDetails>;

    /// Stops a container, waiting up to `timeout` before killing it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container no longer exists.
    async fn stop(
        &self,
        id: &ContainerId,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container no longer exists and `Conflict`
    /// if it is running and `force` is not set.
    async fn remove(
        &self,
        id: &ContainerId,
        options: RemoveContainerOptions,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Sends a signal to a running container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container no longer exists and `Conflict`
    /// if it is not running.
    async fn kill(&self, id: &ContainerId, signal: &str, cancel: &CancellationToken) -> Result<()>;

    /// Freezes a running container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container no longer exists and `Conflict`
    /// if it is not running.
    async fn pause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()>;

    /// Thaws a paused container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container no longer exists and `Conflict`
    /// if it is not paused.
    async fn unpause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()>;
}

/// Fails with `Cancelled` if the token has fired.
///
/// # Errors
///
/// Returns [`FlotillaError::Cancelled`] when `cancel` is cancelled.
pub fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(FlotillaError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(service: &str, state: ContainerState, oneoff: bool) -> ContainerSummary {
        let mut labels = BTreeMap::new();
        let _ = labels.insert(PROJECT_LABEL.to_string(), "shop".to_string());
        let _ = labels.insert(SERVICE_LABEL.to_string(), service.to_string());
        let _ = labels.insert(
            ONEOFF_LABEL.to_string(),
            if oneoff { "True" } else { "False" }.to_string(),
        );
        ContainerSummary {
            id: ContainerId::new(format!("{service}-id")),
            names: vec![format!("/shop-{service}-1")],
            labels,
            state,
            image: "alpine".into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn filter_without_all_skips_stopped() {
        let filter = ListFilter::default();
        assert!(!filter.matches(&summary("web", ContainerState::Stopped, false)));
        assert!(filter.matches(&summary("web", ContainerState::Running, false)));
    }

    #[test]
    fn same_key_filters_are_alternatives() {
        let filter = ListFilter {
            labels: vec![
                LabelFilter::equals(SERVICE_LABEL, "web"),
                LabelFilter::equals(SERVICE_LABEL, "db"),
            ],
            all: true,
        };
        assert!(filter.matches(&summary("web", ContainerState::Stopped, false)));
        assert!(filter.matches(&summary("db", ContainerState::Stopped, false)));
        assert!(!filter.matches(&summary("cache", ContainerState::Stopped, false)));
    }

    #[test]
    fn different_keys_must_all_hold() {
        let filter = ListFilter {
            labels: vec![
                LabelFilter::equals(PROJECT_LABEL, "shop"),
                LabelFilter::equals(ONEOFF_LABEL, "False"),
            ],
            all: true,
        };
        assert!(filter.matches(&summary("web", ContainerState::Running, false)));
        assert!(!filter.matches(&summary("web", ContainerState::Running, true)));
    }

    #[test]
    fn presence_filter_requires_label() {
        let filter = ListFilter {
            labels: vec![LabelFilter::present("com.acme.missing")],
            all: true,
        };
        assert!(!filter.matches(&summary("web", ContainerState::Running, false)));
    }

    #[test]
    fn summary_label_accessors() {
        let c = summary("web", ContainerState::Running, true);
        assert_eq!(c.project(), Some("shop"));
        assert_eq!(c.service(), Some("web"));
        assert!(c.is_oneoff());
    }

    #[test]
    fn cancelled_token_is_rejected() {
        let token = CancellationToken::new();
        assert!(ensure_not_cancelled(&token).is_ok());
        token.cancel();
        assert!(matches!(ensure_not_cancelled(&token), Err(FlotillaError::Cancelled)));
    }
}

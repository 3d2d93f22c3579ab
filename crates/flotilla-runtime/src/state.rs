//! Container state index.
//!
//! Holds the set of containers a runtime knows about and the lifecycle
//! transitions it accepts. The local runtime persists the index as JSON;
//! the in-memory runtime keeps it behind a lock.

use std::collections::BTreeMap;
use std::path::Path;

use flotilla_common::constants::{CONTAINER_NUMBER_LABEL, ONEOFF_LABEL, PROJECT_LABEL, SERVICE_LABEL};
use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::{ContainerId, ContainerState};
use serde::{Deserialize, Serialize};

use crate::backend::{ContainerDetails, ContainerSummary, ListFilter, RemoveContainerOptions};

/// Persistent record of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Container identifier.
    pub id: ContainerId,
    /// Primary name, without the leading `/`.
    pub name: String,
    /// Container labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Image reference.
    #[serde(default)]
    pub image: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl StateEntry {
    /// Creates a record in the `Created` state, stamped with the current time.
    #[must_use]
    pub fn new(id: ContainerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            labels: BTreeMap::new(),
            state: ContainerState::Created,
            image: String::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates a record for replica `number` of a project service, labelled
    /// the way the lifecycle engine queries for it.
    #[must_use]
    pub fn service_replica(project: &str, service: &str, number: u32) -> Self {
        let project = project.to_lowercase();
        let mut entry = Self::new(ContainerId::generate(), format!("{project}-{service}-{number}"));
        entry.set_labels(&project, service, false);
        let _ = entry
            .labels
            .insert(CONTAINER_NUMBER_LABEL.to_string(), number.to_string());
        entry
    }

    /// Creates a record for an ad-hoc container of a project service.
    #[must_use]
    pub fn oneoff(project: &str, service: &str) -> Self {
        let project = project.to_lowercase();
        let id = ContainerId::generate();
        let name = format!("{project}-{service}-run-{}", id.short());
        let mut entry = Self::new(id, name);
        entry.set_labels(&project, service, true);
        entry
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub const fn with_state(mut self, state: ContainerState) -> Self {
        self.state = state;
        self
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    fn set_labels(&mut self, project: &str, service: &str, oneoff: bool) {
        let _ = self.labels.insert(PROJECT_LABEL.to_string(), project.to_string());
        let _ = self.labels.insert(SERVICE_LABEL.to_string(), service.to_string());
        let _ = self.labels.insert(
            ONEOFF_LABEL.to_string(),
            if oneoff { "True" } else { "False" }.to_string(),
        );
    }

    /// Returns the listing view of this record.
    #[must_use]
    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            id: self.id.clone(),
            names: vec![format!("/{}", self.name)],
            labels: self.labels.clone(),
            state: self.state,
            image: self.image.clone(),
            created_at: self.created_at.clone(),
        }
    }

    /// Returns the inspection view of this record.
    #[must_use]
    pub fn details(&self) -> ContainerDetails {
        ContainerDetails {
            id: self.id.clone(),
            name: format!("/{}", self.name),
            state: self.state,
            labels: self.labels.clone(),
        }
    }

    fn conflict(&self, what: &str) -> FlotillaError {
        FlotillaError::Conflict {
            message: format!("container {} {what}", self.name),
        }
    }
}

/// A lifecycle mutation accepted by [`StateIndex::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Stop the container; a no-op if it is not running.
    Stop,
    /// Deliver a signal; the container must be running.
    Kill(String),
    /// Freeze; the container must be running and not paused.
    Pause,
    /// Thaw; the container must be paused.
    Unpause,
    /// Delete the record; a running container requires `force`.
    Remove(RemoveContainerOptions),
}

/// The full set of containers known to a runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateIndex {
    /// Container records, in creation order.
    pub containers: Vec<StateEntry>,
}

impl StateIndex {
    /// Returns the record for `id`.
    #[must_use]
    pub fn find(&self, id: &ContainerId) -> Option<&StateEntry> {
        self.containers.iter().find(|e| e.id == *id)
    }

    /// Returns summaries of all records matching `filter`.
    #[must_use]
    pub fn list(&self, filter: &ListFilter) -> Vec<ContainerSummary> {
        self.containers
            .iter()
            .map(StateEntry::summary)
            .filter(|s| filter.matches(s))
            .collect()
    }

    /// Returns the inspection view of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists.
    pub fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails> {
        self.find(id)
            .map(StateEntry::details)
            .ok_or_else(|| FlotillaError::container_not_found(id.as_str()))
    }

    /// Applies a lifecycle transition to `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists and `Conflict` if the record's
    /// state does not admit the transition.
    pub fn apply(&mut self, id: &ContainerId, transition: &Transition) -> Result<()> {
        let position = self
            .containers
            .iter()
            .position(|e| e.id == *id)
            .ok_or_else(|| FlotillaError::container_not_found(id.as_str()))?;
        let entry = &mut self.containers[position];

        match transition {
            Transition::Stop => {
                if entry.state.is_active() {
                    entry.state = ContainerState::Stopped;
                }
            }
            Transition::Kill(signal) => {
                if entry.state != ContainerState::Running {
                    return Err(entry.conflict("is not running"));
                }
                tracing::debug!(id = %id, signal = %signal, "signal delivered");
                entry.state = ContainerState::Stopped;
            }
            Transition::Pause => match entry.state {
                ContainerState::Running => entry.state = ContainerState::Paused,
                ContainerState::Paused => return Err(entry.conflict("is already paused")),
                _ => return Err(entry.conflict("is not running")),
            },
            Transition::Unpause => {
                if entry.state != ContainerState::Paused {
                    return Err(entry.conflict("is not paused"));
                }
                entry.state = ContainerState::Running;
            }
            Transition::Remove(options) => {
                if entry.state.is_active() && !options.force {
                    return Err(entry.conflict(
                        "is running: stop the container before removing or force remove",
                    ));
                }
                let _ = self.containers.remove(position);
            }
        }
        Ok(())
    }
}

/// Loads the state index from disk.
///
/// A missing file is an empty index.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<StateIndex> {
    tracing::debug!(path = %path.display(), "loading state index");
    if !path.exists() {
        return Ok(StateIndex::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| FlotillaError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Persists the state index to disk atomically.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_state(path: &Path, index: &StateIndex) -> Result<()> {
    tracing::debug!(path = %path.display(), containers = index.containers.len(), "saving state index");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FlotillaError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(index)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| FlotillaError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| FlotillaError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(state: ContainerState) -> (StateIndex, ContainerId) {
        let id = ContainerId::new("c1");
        let mut entry = StateEntry::new(id.clone(), "shop-web-1");
        entry.state = state;
        (
            StateIndex {
                containers: vec![entry],
            },
            id,
        )
    }

    #[test]
    fn stop_is_noop_on_stopped_container() {
        let (mut index, id) = index_with(ContainerState::Stopped);
        index.apply(&id, &Transition::Stop).expect("stop");
        assert_eq!(index.find(&id).unwrap().state, ContainerState::Stopped);
    }

    #[test]
    fn remove_running_without_force_conflicts() {
        let (mut index, id) = index_with(ContainerState::Running);
        let err = index
            .apply(&id, &Transition::Remove(RemoveContainerOptions::default()))
            .unwrap_err();
        assert!(matches!(err, FlotillaError::Conflict { .. }));
        assert!(index.find(&id).is_some());
    }

    #[test]
    fn force_remove_running_deletes_record() {
        let (mut index, id) = index_with(ContainerState::Running);
        let options = RemoveContainerOptions {
            volumes: false,
            force: true,
        };
        index.apply(&id, &Transition::Remove(options)).expect("remove");
        assert!(index.find(&id).is_none());
    }

    #[test]
    fn missing_container_is_not_found() {
        let mut index = StateIndex::default();
        let err = index
            .apply(&ContainerId::new("ghost"), &Transition::Stop)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(index.inspect(&ContainerId::new("ghost")).unwrap_err().is_not_found());
    }

    #[test]
    fn pause_and_unpause_cycle() {
        let (mut index, id) = index_with(ContainerState::Running);
        index.apply(&id, &Transition::Pause).expect("pause");
        assert!(index.inspect(&id).unwrap().is_paused());
        assert!(index.apply(&id, &Transition::Pause).is_err());
        index.apply(&id, &Transition::Unpause).expect("unpause");
        assert_eq!(index.find(&id).unwrap().state, ContainerState::Running);
    }

    #[test]
    fn kill_requires_running() {
        let (mut index, id) = index_with(ContainerState::Stopped);
        let err = index
            .apply(&id, &Transition::Kill("SIGKILL".into()))
            .unwrap_err();
        assert!(matches!(err, FlotillaError::Conflict { .. }));
    }

    #[test]
    fn service_replica_is_labelled() {
        let entry = StateEntry::service_replica("Shop", "web", 2);
        let summary = entry.summary();
        assert_eq!(summary.project(), Some("shop"));
        assert_eq!(summary.service(), Some("web"));
        assert!(!summary.is_oneoff());
        assert_eq!(summary.names, vec!["/shop-web-2".to_string()]);
    }

    #[test]
    fn oneoff_is_labelled() {
        let entry = StateEntry::oneoff("shop", "web");
        assert!(entry.summary().is_oneoff());
        assert!(entry.name.starts_with("shop-web-run-"));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = load_state(&dir.path().join("state.json")).expect("load");
        assert!(index.containers.is_empty());
    }

    #[test]
    fn save_then_load_preserves_states() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");
        let (index, id) = index_with(ContainerState::Paused);

        save_state(&path, &index).expect("save");
        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded.find(&id).unwrap().state, ContainerState::Paused);
        assert!(!path.with_extension("json.tmp").exists());
    }
}

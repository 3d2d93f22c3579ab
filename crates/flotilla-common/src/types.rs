//! Domain primitive types used across the Flotilla workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque runtime identifier of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12-character short form used in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Case-insensitive project name, canonicalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Creates a project name, folding it to lowercase.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    /// Returns the canonical (lowercase) name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for ProjectName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

/// Lifecycle state of a container as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Container has been created but not yet started.
    Created,
    /// Container is actively running.
    Running,
    /// Container processes are frozen.
    Paused,
    /// Container has exited.
    Stopped,
    /// Container encountered a fatal error.
    Failed,
}

impl ContainerState {
    /// Returns `true` if the container has live processes (running or paused).
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_is_case_folded() {
        assert_eq!(ProjectName::new("Shop").as_str(), "shop");
        assert_eq!(ProjectName::from("SHOP"), ProjectName::from("shop"));
    }

    #[test]
    fn project_name_deserializes_case_folded() {
        let name: ProjectName = serde_json::from_str("\"MyApp\"").expect("deserialize");
        assert_eq!(name.as_str(), "myapp");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn short_id_truncates() {
        let id = ContainerId::new("0123456789abcdef");
        assert_eq!(id.short(), "0123456789ab");
        assert_eq!(ContainerId::new("abc").short(), "abc");
    }

    #[test]
    fn paused_counts_as_active() {
        assert!(ContainerState::Paused.is_active());
        assert!(ContainerState::Running.is_active());
        assert!(!ContainerState::Stopped.is_active());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&ContainerState::Running).expect("serialize");
        assert_eq!(json, "\"running\"");
    }
}

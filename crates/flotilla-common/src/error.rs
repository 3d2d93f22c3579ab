//! Unified error types for the Flotilla workspace.
//!
//! The runtime client, the lifecycle engine, and the CLI all speak
//! [`FlotillaError`]. The one classification that matters to the engine is
//! [`FlotillaError::is_not_found`]: a resource that vanished between listing
//! and acting is recovered locally and never surfaced.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum FlotillaError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The operation requires a state the targets are not in.
    #[error("{message}")]
    PreconditionUnmet {
        /// Description of the unmet precondition.
        message: String,
    },

    /// The runtime rejected the mutation given the resource's current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict reported by the runtime.
        message: String,
    },

    /// Any other failure reported by the container runtime.
    #[error("runtime error: {message}")]
    Runtime {
        /// Description of the runtime failure.
        message: String,
    },

    /// A mutation against a single container failed during a bulk operation.
    #[error("container {name} ({id}): {source}")]
    Mutation {
        /// Runtime ID of the container.
        id: String,
        /// Canonical name of the container.
        name: String,
        /// Original cause reported by the runtime.
        #[source]
        source: Box<FlotillaError>,
    },

    /// The operation observed a cancelled execution context.
    #[error("operation cancelled")]
    Cancelled,

    /// Reading the confirmation answer failed.
    #[error("confirmation prompt failed: {source}")]
    Prompt {
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl FlotillaError {
    /// Creates a `NotFound` error for a container ID.
    #[must_use]
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "container",
            id: id.into(),
        }
    }

    /// Returns `true` when the error means the target no longer exists.
    ///
    /// A [`Mutation`](Self::Mutation) wrapper is classified by its cause.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Mutation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns `true` when the error was produced by observing cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Mutation { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, FlotillaError>;

//! Engine error types.

use crate::resource::ResourceKind;
use thiserror::Error;

/// Errors surfaced by loading, resolution, enforcement, and adoption.
#[derive(Error, Debug)]
pub enum Error {
    /// User input is structurally or semantically invalid.
    #[error("{0}")]
    Configuration(String),

    /// A remote list/fetch/update call failed.
    #[error("failed to {operation} {kind}: {source:#}")]
    Remote {
        operation: String,
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("{kind} \"{identifier}\" not found")]
    NotFound {
        kind: ResourceKind,
        identifier: String,
    },

    /// Metadata that cannot be interpreted unambiguously, rejected before any remote call.
    #[error("{0}")]
    AmbiguousMetadata(String),

    #[error("{kind} \"{identifier}\" matched {count} remote objects")]
    Ambiguous {
        kind: ResourceKind,
        identifier: String,
        count: usize,
    },

    #[error("namespace enforcement failed:\n  - {}", .0.join("\n  - "))]
    NamespaceEnforcement(Vec<String>),

    #[error("resource '{name}' ({kind}) is protected and cannot be {verb}")]
    Protected {
        kind: ResourceKind,
        name: String,
        verb: &'static str,
    },

    #[error("circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn remote(operation: &str, kind: ResourceKind, source: anyhow::Error) -> Self {
        Error::Remote {
            operation: operation.to_string(),
            kind,
            source,
        }
    }

    /// Errors caused by the user's input rather than by the remote side.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::AmbiguousMetadata(_)
                | Error::NamespaceEnforcement(_)
                | Error::Protected { .. }
                | Error::CircularDependency(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

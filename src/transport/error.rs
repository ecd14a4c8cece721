use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by transport capability calls.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Session to a remote machine could not be established or was lost.
    /// Scoped to one machine: its remaining actions are skipped, other
    /// machines proceed.
    #[error("connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("remote {operation} on {path} failed: {reason}")]
    Remote {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },
}

impl TransportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransportError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error invalidates the whole session rather than a single
    /// capability call.
    pub fn is_connection(&self) -> bool {
        matches!(self, TransportError::Connection { .. })
    }
}

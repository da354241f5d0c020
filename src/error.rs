//! Error taxonomy for the messages core.
//!
//! Every public session operation converts these into text or a record before
//! returning, so nothing here ever escapes to a caller as a fault.
//!
//! CHANGELOG:
//! - 10/19/2026 - Split store and automation errors out of MessagesError

use std::path::PathBuf;
use thiserror::Error;

/// Remediation shown whenever a local store exists but cannot be read.
pub const FULL_DISK_ACCESS_HINT: &str = "Grant Full Disk Access to the application running this tool \
(System Settings > Privacy & Security > Full Disk Access) and restart it.";

/// Failures of the Store Access Layer.
///
/// The three cases are kept apart because only `PermissionDenied` has an
/// actionable fix on the user's side.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{store} not found at {path}")]
    Missing { store: &'static str, path: PathBuf },

    #[error("cannot read {store} at {path}: {detail}. {hint}", hint = FULL_DISK_ACCESS_HINT)]
    PermissionDenied {
        store: &'static str,
        path: PathBuf,
        detail: String,
    },

    #[error("query against {store} failed: {source}")]
    Query {
        store: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }
}

/// Failures of the OS automation layer (osascript).
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("failed to launch osascript: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("AppleScript failed: {0}")]
    Script(String),

    #[error("{0}")]
    Rejected(String),

    #[error("failed to stage message body: {0}")]
    TransientFile(#[source] std::io::Error),
}

/// Errors surfaced by retrieval, resolution and dispatch.
#[derive(Error, Debug)]
pub enum MessagesError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    ChannelFailure(String),

    #[error("{0}")]
    Unknown(String),
}

impl MessagesError {
    /// Short machine-readable code used in daemon error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            MessagesError::PermissionDenied(_) => "PERMISSION_DENIED",
            MessagesError::NotFound(_) => "NOT_FOUND",
            MessagesError::InvalidInput(_) => "INVALID_INPUT",
            MessagesError::ChannelFailure(_) => "CHANNEL_FAILURE",
            MessagesError::Unknown(_) => "ERROR",
        }
    }
}

impl From<StoreError> for MessagesError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { .. } => MessagesError::NotFound(err.to_string()),
            StoreError::PermissionDenied { .. } => MessagesError::PermissionDenied(err.to_string()),
            StoreError::Query { .. } => MessagesError::Unknown(err.to_string()),
        }
    }
}

pub type Result<T, E = MessagesError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_permission_denied_carries_hint() {
        let denied = StoreError::PermissionDenied {
            store: "Messages database",
            path: PathBuf::from("/tmp/chat.db"),
            detail: "unable to open database file".into(),
        };
        let missing = StoreError::Missing {
            store: "Messages database",
            path: PathBuf::from("/tmp/chat.db"),
        };
        assert!(denied.to_string().contains("Full Disk Access"));
        assert!(!missing.to_string().contains("Full Disk Access"));
    }

    #[test]
    fn test_store_error_classification_maps_to_taxonomy() {
        let missing = StoreError::Missing {
            store: "Messages database",
            path: PathBuf::from("/nope"),
        };
        assert_eq!(MessagesError::from(missing).code(), "NOT_FOUND");

        let denied = StoreError::PermissionDenied {
            store: "Messages database",
            path: PathBuf::from("/nope"),
            detail: "denied".into(),
        };
        assert_eq!(MessagesError::from(denied).code(), "PERMISSION_DENIED");
    }
}

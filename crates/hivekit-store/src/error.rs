//! Error types for store operations.

use hivekit_platform::{PlatformResult, PlatformStatus};
use hivekit_types::ValueKind;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during store operations.
///
/// Every platform failure names the high-level operation it happened in
/// (`"Create registry key"`, `"Copy registry key"`, ...).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The node or value does not exist.
    #[error("{operation}: not found")]
    NotFound { operation: &'static str },

    /// The stored value has a different type than the one requested.
    #[error("value {name:?} is stored as {actual}, not {expected}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The platform refused access.
    #[error("{operation}: permission denied")]
    PermissionDenied { operation: &'static str },

    /// Any other platform failure.
    #[error("{operation} failed with code {code}", code = .status.code())]
    Platform {
        operation: &'static str,
        #[source]
        status: PlatformStatus,
    },

    /// An unusable monitor configuration, such as an empty event list.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Classify a failed platform call made during `operation`.
    pub fn from_status(operation: &'static str, status: PlatformStatus) -> Self {
        debug!(operation, code = status.code(), %status, "platform call failed");
        match status {
            PlatformStatus::FileNotFound => Self::NotFound { operation },
            PlatformStatus::AccessDenied => Self::PermissionDenied { operation },
            status => Self::Platform { operation, status },
        }
    }

    /// The native status code behind this error, if it came from the
    /// platform.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::NotFound { .. } => Some(PlatformStatus::FileNotFound.code()),
            Self::PermissionDenied { .. } => Some(PlatformStatus::AccessDenied.code()),
            Self::Platform { status, .. } => Some(status.code()),
            Self::TypeMismatch { .. } | Self::Configuration(_) => None,
        }
    }

    /// The operation name, for errors raised by a platform call.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { operation }
            | Self::PermissionDenied { operation }
            | Self::Platform { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Attach an operation name to a platform result.
pub(crate) trait During<T> {
    fn during(self, operation: &'static str) -> StoreResult<T>;
}

impl<T> During<T> for PlatformResult<T> {
    fn during(self, operation: &'static str) -> StoreResult<T> {
        self.map_err(|status| StoreError::from_status(operation, status))
    }
}

/// Treat a missing node as already deleted.
pub(crate) fn ignore_not_found(result: StoreResult<()>) -> StoreResult<()> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

/// Convenience type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_classified() {
        assert!(matches!(
            StoreError::from_status("Open registry key", PlatformStatus::FileNotFound),
            StoreError::NotFound { operation: "Open registry key" }
        ));
        assert!(matches!(
            StoreError::from_status("Delete registry key", PlatformStatus::AccessDenied),
            StoreError::PermissionDenied { .. }
        ));
        assert!(matches!(
            StoreError::from_status("Copy registry key", PlatformStatus::KeyDeleted),
            StoreError::Platform { status: PlatformStatus::KeyDeleted, .. }
        ));
    }

    #[test]
    fn codes_and_operations() {
        let err = StoreError::from_status("Copy registry key", PlatformStatus::Other(1450));
        assert_eq!(err.code(), Some(1450));
        assert_eq!(err.operation(), Some("Copy registry key"));
        assert_eq!(err.to_string(), "Copy registry key failed with code 1450");

        let err = StoreError::Configuration("empty".into());
        assert_eq!(err.code(), None);
        assert_eq!(err.operation(), None);
    }

    #[test]
    fn not_found_is_ignored_for_deletes() {
        let missing: StoreResult<()> = Err(StoreError::NotFound { operation: "x" });
        assert!(ignore_not_found(missing).is_ok());

        let denied: StoreResult<()> = Err(StoreError::PermissionDenied { operation: "x" });
        assert!(matches!(
            ignore_not_found(denied),
            Err(StoreError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn type_mismatch_display() {
        let err = StoreError::TypeMismatch {
            name: "Uint32Value".into(),
            expected: ValueKind::StringArray,
            actual: ValueKind::U32,
        };
        let msg = err.to_string();
        assert!(msg.contains("Uint32Value"));
    }
}

use thiserror::Error;

/// Status returned by a failed platform primitive.
///
/// Each variant carries the numeric code the native store API uses for the
/// same condition, available through [`PlatformStatus::code`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum PlatformStatus {
    #[error("the system cannot find the file specified")]
    FileNotFound,

    #[error("access is denied")]
    AccessDenied,

    #[error("the handle is invalid")]
    InvalidHandle,

    #[error("the data is invalid")]
    InvalidData,

    #[error("the parameter is incorrect")]
    InvalidParameter,

    #[error("the configuration registry database is corrupt")]
    RegistryCorrupt,

    #[error("illegal operation attempted on a registry key that has been marked for deletion")]
    KeyDeleted,

    /// A code the emulation does not produce itself.
    #[error("platform error {0}")]
    Other(u32),
}

impl PlatformStatus {
    /// Native numeric status code.
    pub fn code(self) -> u32 {
        match self {
            Self::FileNotFound => 2,
            Self::AccessDenied => 5,
            Self::InvalidHandle => 6,
            Self::InvalidData => 13,
            Self::InvalidParameter => 87,
            Self::RegistryCorrupt => 1015,
            Self::KeyDeleted => 1018,
            Self::Other(code) => code,
        }
    }

    pub fn is_not_found(self) -> bool {
        matches!(self, Self::FileNotFound)
    }
}

/// Result alias for platform primitives.
pub type PlatformResult<T> = Result<T, PlatformStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_native_api() {
        for (status, code) in [
            (PlatformStatus::FileNotFound, 2),
            (PlatformStatus::AccessDenied, 5),
            (PlatformStatus::InvalidHandle, 6),
            (PlatformStatus::InvalidData, 13),
            (PlatformStatus::InvalidParameter, 87),
            (PlatformStatus::RegistryCorrupt, 1015),
            (PlatformStatus::KeyDeleted, 1018),
            (PlatformStatus::Other(1450), 1450),
        ] {
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn display_is_the_native_message() {
        assert_eq!(PlatformStatus::AccessDenied.to_string(), "access is denied");
        assert_eq!(PlatformStatus::Other(1450).to_string(), "platform error 1450");
    }
}

use thiserror::Error;

/// Errors produced while parsing or validating hivekit types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown root key: {0}")]
    UnknownRoot(String),

    #[error("unknown view: {0}")]
    UnknownView(String),

    #[error("unknown value kind: {0}")]
    UnknownValueKind(String),

    #[error("unknown value type tag: {0}")]
    UnknownTypeTag(u32),

    #[error("invalid {kind} value {input:?}: {reason}")]
    InvalidValue {
        kind: &'static str,
        input: String,
        reason: String,
    },

    #[error("unknown event flag: {0}")]
    UnknownEventFlag(String),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

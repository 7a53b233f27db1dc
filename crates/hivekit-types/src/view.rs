use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Which of the parallel namespaces an operation targets.
///
/// `Force32` and `Force64` are only meaningful on platforms hosting two
/// namespaces; elsewhere they alias the single namespace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    /// Whatever the current process naturally sees.
    #[default]
    Default,
    /// The 32-bit namespace.
    Force32,
    /// The 64-bit namespace.
    Force64,
}

impl View {
    /// Returns `true` for `Force32` / `Force64`.
    pub fn is_forced(self) -> bool {
        !matches!(self, Self::Default)
    }

    /// The bitness this view selects, with `Default` resolved against
    /// the process's native bitness.
    pub fn resolve(self, native: Bitness) -> Bitness {
        match self {
            Self::Default => native,
            Self::Force32 => Bitness::Bits32,
            Self::Force64 => Bitness::Bits64,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Force32 => write!(f, "32"),
            Self::Force64 => write!(f, "64"),
        }
    }
}

impl FromStr for View {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "native" => Ok(Self::Default),
            "32" | "force32" | "wow64_32" => Ok(Self::Force32),
            "64" | "force64" | "wow64_64" => Ok(Self::Force64),
            _ => Err(TypeError::UnknownView(s.to_string())),
        }
    }
}

/// A concrete namespace: the one a `View` resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bitness {
    Bits32,
    Bits64,
}

impl Default for Bitness {
    fn default() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::Bits64
        } else {
            Self::Bits32
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits32 => write!(f, "32-bit"),
            Self::Bits64 => write!(f, "64-bit"),
        }
    }
}

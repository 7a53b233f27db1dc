use hivekit_types::Bitness;
use serde::{Deserialize, Serialize};

/// Configuration for [`MemoryPlatform`](crate::MemoryPlatform).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Whether the store hosts separate 32-bit and 64-bit namespaces. When
    /// `false`, forced views alias the single native namespace.
    pub dual_view: bool,
    /// The namespace `View::Default` resolves to.
    pub native_bitness: Bitness,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            dual_view: true,
            native_bitness: Bitness::default(),
        }
    }
}

impl PlatformConfig {
    /// A single-namespace platform of the given bitness.
    pub fn single_view(native_bitness: Bitness) -> Self {
        Self {
            dual_view: false,
            native_bitness,
        }
    }
}

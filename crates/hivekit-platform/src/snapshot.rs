//! Snapshot persistence for [`MemoryPlatform`].
//!
//! A snapshot captures the configuration and every namespace tree (names,
//! value tags and encoded bytes). Open handles and pending subscriptions
//! are process-local and never persisted.

use std::fs;
use std::io::Write;
use std::path::Path;

use hivekit_types::{Bitness, RootKey, ValueKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::memory::MemoryPlatform;
use crate::status::PlatformStatus;

/// Errors from saving or loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The snapshot contradicts its own configuration.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),

    /// The platform failed while exporting or importing a tree.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformStatus),
}

/// One named value of a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSnapshot {
    pub name: String,
    pub kind: ValueKind,
    pub data: Vec<u8>,
}

/// A node with its values and descendants.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: String,
    #[serde(default)]
    pub values: Vec<ValueSnapshot>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Total number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::node_count).sum::<usize>()
    }
}

/// The tree of one root in one namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub root: RootKey,
    pub bitness: Bitness,
    pub tree: NodeSnapshot,
}

/// Everything needed to rebuild a [`MemoryPlatform`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub config: PlatformConfig,
    pub views: Vec<ViewSnapshot>,
}

impl StoreSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }
}

impl MemoryPlatform {
    /// Write the current contents to `path` as JSON.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place, so a crash never leaves a truncated snapshot behind.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = self.snapshot()?.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| SnapshotError::Io(e.error))?;
        debug!(path = %path.display(), bytes = json.len(), "snapshot saved");
        Ok(())
    }

    /// Rebuild a platform from a snapshot file.
    pub fn load_snapshot(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        let snapshot = StoreSnapshot::from_json(&json)?;
        let platform = Self::from_snapshot(&snapshot)?;
        debug!(path = %path.display(), views = snapshot.views.len(), "snapshot loaded");
        Ok(platform)
    }

    /// Load `path` if it exists, otherwise start empty with `config`.
    pub fn load_or_new(path: &Path, config: PlatformConfig) -> Result<Self, SnapshotError> {
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            Ok(Self::with_config(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{KeyRef, PlatformStore, RawValue};
    use hivekit_types::AccessMask;

    fn populated() -> MemoryPlatform {
        let platform = MemoryPlatform::new();
        let (key, _) = platform
            .create_key(
                KeyRef::Root(RootKey::CurrentUser),
                "Software\\Test\\Child",
                AccessMask::ALL_ACCESS,
            )
            .unwrap();
        platform
            .set_value(key, "Answer", RawValue::new(ValueKind::U32, 42u32.to_le_bytes().to_vec()))
            .unwrap();
        platform.close_key(key).unwrap();
        platform
    }

    #[test]
    fn snapshot_json_round_trip() {
        let platform = populated();
        let snapshot = platform.snapshot().unwrap();
        let json = snapshot.to_json().unwrap();
        assert_eq!(StoreSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        populated().save_snapshot(&path).unwrap();
        let restored = MemoryPlatform::load_snapshot(&path).unwrap();

        let key = restored
            .open_key(
                KeyRef::Root(RootKey::CurrentUser),
                "Software/Test/Child",
                AccessMask::READ,
            )
            .unwrap();
        let value = restored.query_value(key, "answer").unwrap();
        assert_eq!(value.kind, ValueKind::U32);
        assert_eq!(value.data, 42u32.to_le_bytes().to_vec());
    }

    #[test]
    fn load_or_new_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let platform = MemoryPlatform::load_or_new(&path, PlatformConfig::default()).unwrap();
        assert_eq!(platform.open_handle_count().unwrap(), 0);
        assert!(platform
            .open_key(KeyRef::Root(RootKey::CurrentUser), "Software", AccessMask::READ)
            .is_err());
    }

    #[test]
    fn load_garbage_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            MemoryPlatform::load_snapshot(&path),
            Err(SnapshotError::Serialization(_))
        ));
    }

    #[test]
    fn single_view_snapshot_rejects_foreign_bitness() {
        let config = PlatformConfig::single_view(Bitness::Bits64);
        let snapshot = StoreSnapshot {
            config,
            views: vec![ViewSnapshot {
                root: RootKey::LocalMachine,
                bitness: Bitness::Bits32,
                tree: NodeSnapshot::default(),
            }],
        };
        assert!(matches!(
            MemoryPlatform::from_snapshot(&snapshot),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn node_count_includes_descendants() {
        let snapshot = populated().snapshot().unwrap();
        let hkcu = snapshot
            .views
            .iter()
            .find(|v| v.root == RootKey::CurrentUser && v.bitness == snapshot.config.native_bitness)
            .unwrap();
        // root, Software, Test, Child
        assert_eq!(hkcu.tree.node_count(), 4);
    }
}

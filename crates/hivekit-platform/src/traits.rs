//! The [`PlatformStore`] trait defining the platform store interface.
//!
//! The shape follows the native API: every call takes either a well-known
//! root or a previously opened handle plus a relative path, and reports
//! failure through a [`PlatformStatus`](crate::PlatformStatus).

use std::fmt;

use hivekit_types::{AccessMask, NotifyFilter, RootKey, ValueKind};
use serde::{Deserialize, Serialize};

use crate::signal::WaitableSignal;
use crate::status::PlatformResult;

/// Opaque platform handle to an open node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawKey(u64);

impl RawKey {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawKey({:#x})", self.0)
    }
}

/// The node a relative path is resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRef {
    /// A predefined root. Roots are always open with full access.
    Root(RootKey),
    /// A handle returned by `open_key` / `create_key`.
    Handle(RawKey),
}

impl From<RootKey> for KeyRef {
    fn from(root: RootKey) -> Self {
        Self::Root(root)
    }
}

impl From<RawKey> for KeyRef {
    fn from(key: RawKey) -> Self {
        Self::Handle(key)
    }
}

/// A value as the platform stores it: type tag plus encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValue {
    pub kind: ValueKind,
    pub data: Vec<u8>,
}

impl RawValue {
    pub fn new(kind: ValueKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }
}

/// Whether `create_key` made a new node or opened an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    CreatedNew,
    OpenedExisting,
}

/// Summary counts for an open node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub sub_keys: usize,
    pub values: usize,
    /// Length in characters of the longest child name.
    pub max_sub_key_len: usize,
    /// Length in characters of the longest value name.
    pub max_value_name_len: usize,
}

/// Primitives the hierarchical store must provide.
///
/// Implementations must be thread-safe. Handles are not reference counted:
/// each successful `open_key` / `create_key` yields a distinct handle that
/// must be passed to `close_key` exactly once.
///
/// View selection: when `parent` is a root, the `WOW64_32KEY` /
/// `WOW64_64KEY` bits of the access mask pick the namespace (neither bit
/// means the native one). Paths resolved against a handle stay in the
/// handle's namespace.
pub trait PlatformStore: Send + Sync {
    /// Open an existing node. Fails with `FileNotFound` if it is absent.
    fn open_key(&self, parent: KeyRef, path: &str, access: AccessMask) -> PlatformResult<RawKey>;

    /// Open a node, creating it and any missing ancestors first.
    fn create_key(
        &self,
        parent: KeyRef,
        path: &str,
        access: AccessMask,
    ) -> PlatformResult<(RawKey, Disposition)>;

    /// Release a handle. Any subscription registered through it is dropped.
    fn close_key(&self, key: RawKey) -> PlatformResult<()>;

    /// Delete a node that has no children. `view` carries only view bits
    /// and is honoured when `parent` is a root.
    fn delete_key(&self, parent: KeyRef, path: &str, view: AccessMask) -> PlatformResult<()>;

    /// Delete every descendant and every value of a node, leaving the node
    /// itself in place. `None` targets `parent` directly.
    fn delete_tree(&self, parent: KeyRef, path: Option<&str>) -> PlatformResult<()>;

    /// Copy the values and descendants of the source node into `dest`,
    /// overwriting values that already exist there.
    fn copy_tree(
        &self,
        source: KeyRef,
        source_path: Option<&str>,
        dest: RawKey,
    ) -> PlatformResult<()>;

    /// Read a value. Fails with `FileNotFound` if the name is absent.
    fn query_value(&self, key: RawKey, name: &str) -> PlatformResult<RawValue>;

    /// Create or overwrite a value.
    fn set_value(&self, key: RawKey, name: &str, value: RawValue) -> PlatformResult<()>;

    /// Delete a value. Fails with `FileNotFound` if the name is absent.
    fn delete_value(&self, key: RawKey, name: &str) -> PlatformResult<()>;

    /// Name of the child at `index`, or `None` past the end.
    fn enum_key(&self, key: RawKey, index: usize) -> PlatformResult<Option<String>>;

    /// Name and type of the value at `index`, or `None` past the end.
    fn enum_value(&self, key: RawKey, index: usize) -> PlatformResult<Option<(String, ValueKind)>>;

    /// Child and value counts.
    fn query_info(&self, key: RawKey) -> PlatformResult<KeyInfo>;

    /// Register a fire-once subscription. The signal is reset when the
    /// subscription is accepted and set on the first matching change.
    fn notify_change(
        &self,
        key: RawKey,
        filter: NotifyFilter,
        watch_subtree: bool,
        signal: &WaitableSignal,
    ) -> PlatformResult<()>;
}

//! Owned node handles with typed value access.

use std::fmt;
use std::sync::Arc;

use hivekit_platform::{KeyInfo, KeyRef, PlatformStore, RawKey, RawValue};
use hivekit_types::{NodePath, Value, ValueKind, View};
use tracing::debug;

use crate::codec;
use crate::error::{During, StoreError, StoreResult};
use crate::view::resolve_access_flags;

pub(crate) const CREATE_KEY: &str = "Create registry key";
pub(crate) const OPEN_KEY: &str = "Open registry key";
const CLOSE_KEY: &str = "Close registry key";
const READ_VALUE: &str = "Read registry value";
const WRITE_VALUE: &str = "Write registry value";
const DELETE_VALUE: &str = "Delete registry value";
const ENUMERATE_KEYS: &str = "Enumerate registry keys";
const ENUMERATE_VALUES: &str = "Enumerate registry values";
const QUERY_INFO: &str = "Query registry key";

/// Exclusive owner of one open platform handle.
///
/// The handle is closed exactly once: by [`StoreHandle::close`], which
/// reports failure, or on drop, which can only log it. A `StoreHandle` is
/// `Send` but offers no internal synchronisation, so share it behind a lock
/// if several threads need it.
pub struct StoreHandle {
    platform: Arc<dyn PlatformStore>,
    key: RawKey,
    path: NodePath,
    open: bool,
}

impl StoreHandle {
    pub(crate) fn new(platform: Arc<dyn PlatformStore>, key: RawKey, path: NodePath) -> Self {
        Self {
            platform,
            key,
            path,
            open: true,
        }
    }

    pub(crate) fn raw(&self) -> RawKey {
        self.key
    }

    pub(crate) fn platform(&self) -> &Arc<dyn PlatformStore> {
        &self.platform
    }

    /// The path this handle was opened at.
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Create (or open, if it exists) a child node with write access.
    ///
    /// Paths resolved against a handle stay in the handle's namespace; the
    /// view only affects the requested access mask.
    pub fn create_child(&self, path: &str, view: View) -> StoreResult<StoreHandle> {
        let path = crate::registry::require_path(path, CREATE_KEY)?;
        let (key, _) = self
            .platform
            .create_key(KeyRef::Handle(self.key), path, resolve_access_flags(true, view))
            .during(CREATE_KEY)?;
        Ok(StoreHandle::new(self.platform.clone(), key, self.path.join(path)))
    }

    /// Open an existing child node. An empty path reopens this node.
    pub fn open_child(&self, path: &str, write_access: bool, view: View) -> StoreResult<StoreHandle> {
        let key = self
            .platform
            .open_key(
                KeyRef::Handle(self.key),
                path,
                resolve_access_flags(write_access, view),
            )
            .during(OPEN_KEY)?;
        Ok(StoreHandle::new(self.platform.clone(), key, self.path.join(path)))
    }

    fn query(&self, name: &str, expected: ValueKind) -> StoreResult<RawValue> {
        let raw = self.platform.query_value(self.key, name).during(READ_VALUE)?;
        if raw.kind != expected {
            return Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual: raw.kind,
            });
        }
        Ok(raw)
    }

    fn read_as(&self, name: &str, expected: ValueKind) -> StoreResult<Value> {
        let raw = self.query(name, expected)?;
        codec::decode(&raw).during(READ_VALUE)
    }

    pub fn read_u32(&self, name: &str) -> StoreResult<u32> {
        match self.read_as(name, ValueKind::U32)? {
            Value::U32(v) => Ok(v),
            other => Err(mismatch(name, ValueKind::U32, &other)),
        }
    }

    pub fn read_u64(&self, name: &str) -> StoreResult<u64> {
        match self.read_as(name, ValueKind::U64)? {
            Value::U64(v) => Ok(v),
            other => Err(mismatch(name, ValueKind::U64, &other)),
        }
    }

    pub fn read_string(&self, name: &str) -> StoreResult<String> {
        match self.read_as(name, ValueKind::String)? {
            Value::String(v) => Ok(v),
            other => Err(mismatch(name, ValueKind::String, &other)),
        }
    }

    pub fn read_string_array(&self, name: &str) -> StoreResult<Vec<String>> {
        match self.read_as(name, ValueKind::StringArray)? {
            Value::StringArray(v) => Ok(v),
            other => Err(mismatch(name, ValueKind::StringArray, &other)),
        }
    }

    pub fn read_blob(&self, name: &str) -> StoreResult<Vec<u8>> {
        match self.read_as(name, ValueKind::Blob)? {
            Value::Blob(v) => Ok(v),
            other => Err(mismatch(name, ValueKind::Blob, &other)),
        }
    }

    /// Read a value of whatever kind is stored.
    pub fn read_value(&self, name: &str) -> StoreResult<Value> {
        let raw = self.platform.query_value(self.key, name).during(READ_VALUE)?;
        codec::decode(&raw).during(READ_VALUE)
    }

    /// Create or overwrite a value, tagged with the value's own kind.
    pub fn write_value(&self, name: &str, value: impl Into<Value>) -> StoreResult<()> {
        let raw = codec::encode(&value.into()).during(WRITE_VALUE)?;
        self.platform.set_value(self.key, name, raw).during(WRITE_VALUE)
    }

    /// Delete a value. A missing value is not an error.
    pub fn delete_value(&self, name: &str) -> StoreResult<()> {
        match self.platform.delete_value(self.key, name).during(DELETE_VALUE) {
            Err(err) if err.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Visit child names until `visit` returns `false` or the children run
    /// out. Order is whatever the platform reports.
    pub fn enumerate_sub_keys<F>(&self, mut visit: F) -> StoreResult<()>
    where
        F: FnMut(&str) -> bool,
    {
        let mut index = 0;
        while let Some(name) = self.platform.enum_key(self.key, index).during(ENUMERATE_KEYS)? {
            if !visit(&name) {
                break;
            }
            index += 1;
        }
        Ok(())
    }

    /// Visit value names and kinds until `visit` returns `false` or the
    /// values run out.
    pub fn enumerate_values<F>(&self, mut visit: F) -> StoreResult<()>
    where
        F: FnMut(&str, ValueKind) -> bool,
    {
        let mut index = 0;
        while let Some((name, kind)) = self
            .platform
            .enum_value(self.key, index)
            .during(ENUMERATE_VALUES)?
        {
            if !visit(&name, kind) {
                break;
            }
            index += 1;
        }
        Ok(())
    }

    /// All child names.
    pub fn sub_key_names(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        self.enumerate_sub_keys(|name| {
            names.push(name.to_string());
            true
        })?;
        Ok(names)
    }

    pub fn query_info(&self) -> StoreResult<KeyInfo> {
        self.platform.query_info(self.key).during(QUERY_INFO)
    }

    /// Close the handle now, reporting any failure.
    pub fn close(mut self) -> StoreResult<()> {
        self.open = false;
        self.platform.close_key(self.key).during(CLOSE_KEY)
    }
}

fn mismatch(name: &str, expected: ValueKind, actual: &Value) -> StoreError {
    StoreError::TypeMismatch {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Err(status) = self.platform.close_key(self.key) {
            debug!(key = ?self.key, path = %self.path, %status, "closing handle failed");
        }
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("key", &self.key)
            .field("path", &self.path.to_string())
            .finish()
    }
}

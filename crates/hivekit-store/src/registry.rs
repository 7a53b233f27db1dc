//! Entry points for opening, deleting, moving and monitoring nodes.
//!
//! [`Registry`] holds nothing but a shared reference to the platform. Every
//! operation resolves its view into access bits, makes the platform calls,
//! and hands back an owned [`StoreHandle`] or [`ChangeMonitor`].
//!
//! # Move protocol
//!
//! [`Registry::move_key`] copies the source subtree into the destination,
//! clears the source's descendants and finally deletes the source node. It
//! is not atomic: a failure after the copy leaves the data in both places
//! and is reported, never rolled back.

use std::sync::Arc;

use hivekit_platform::{KeyRef, PlatformStatus, PlatformStore, RawKey};
use hivekit_types::path;
use hivekit_types::{AccessMask, EventFlag, NodePath, RootKey, View};
use tracing::warn;

use crate::error::{ignore_not_found, During, StoreError, StoreResult};
use crate::handle::{StoreHandle, CREATE_KEY, OPEN_KEY};
use crate::monitor::{notify_filter, ChangeMonitor};
use crate::view::{resolve_access_flags, view_flag};

const DELETE_KEY: &str = "Delete registry key";
const DELETE_TREE: &str = "Delete registry tree";
const OPEN_FOR_DELETE_TREE: &str = "Open registry key for deleting tree";
const OPEN_FOR_MONITOR: &str = "Open registry key for monitoring";
const CREATE_DESTINATION: &str = "Create destination key";
const OPEN_SOURCE: &str = "Open source key";
const COPY_KEY: &str = "Copy registry key";
const CLEAN_UP_TREE: &str = "Clean up source tree";
const CLEAN_UP_KEY: &str = "Clean up source key";

/// Fail with `InvalidParameter` unless `path` names a node below its root.
pub(crate) fn require_path<'a>(path: &'a str, operation: &'static str) -> StoreResult<&'a str> {
    if path::components(path).next().is_none() {
        return Err(StoreError::from_status(operation, PlatformStatus::InvalidParameter));
    }
    Ok(path)
}

/// Returns `true` if `inner` is `outer` or lies below it.
fn is_within(outer: &str, inner: &str) -> bool {
    let mut inner = path::components(inner);
    path::components(outer).all(|o| {
        inner
            .next()
            .is_some_and(|i| i.to_lowercase() == o.to_lowercase())
    })
}

/// Facade over a [`PlatformStore`].
#[derive(Clone)]
pub struct Registry {
    platform: Arc<dyn PlatformStore>,
}

impl Registry {
    pub fn new(platform: Arc<dyn PlatformStore>) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &Arc<dyn PlatformStore> {
        &self.platform
    }

    fn handle(&self, key: RawKey, root: RootKey, path: &str) -> StoreHandle {
        StoreHandle::new(self.platform.clone(), key, NodePath::new(root, path))
    }

    /// Create a node (and any missing ancestors) and open it with write
    /// access. Opens the node if it already exists.
    pub fn create_key(&self, root: RootKey, path: &str, view: View) -> StoreResult<StoreHandle> {
        let path = require_path(path, CREATE_KEY)?;
        let (key, _) = self
            .platform
            .create_key(KeyRef::Root(root), path, resolve_access_flags(true, view))
            .during(CREATE_KEY)?;
        Ok(self.handle(key, root, path))
    }

    /// Open an existing node. An empty path opens the root itself.
    pub fn open_key(
        &self,
        root: RootKey,
        path: &str,
        write_access: bool,
        view: View,
    ) -> StoreResult<StoreHandle> {
        let key = self
            .platform
            .open_key(KeyRef::Root(root), path, resolve_access_flags(write_access, view))
            .during(OPEN_KEY)?;
        Ok(self.handle(key, root, path))
    }

    /// Delete a node that has no children. A missing node is not an error;
    /// a node with children fails with `PermissionDenied`.
    pub fn delete_key(&self, root: RootKey, path: &str, view: View) -> StoreResult<()> {
        let path = require_path(path, DELETE_KEY)?;
        ignore_not_found(
            self.platform
                .delete_key(KeyRef::Root(root), path, view_flag(view))
                .during(DELETE_KEY),
        )
    }

    /// Delete every descendant and value of a node, leaving the node itself.
    /// A missing node is not an error.
    pub fn delete_tree(&self, root: RootKey, path: &str, view: View) -> StoreResult<()> {
        let path = require_path(path, DELETE_TREE)?;
        if !view.is_forced() {
            return ignore_not_found(
                self.platform
                    .delete_tree(KeyRef::Root(root), Some(path))
                    .during(DELETE_TREE),
            );
        }

        let key = match self
            .platform
            .open_key(KeyRef::Root(root), path, AccessMask::ALL_ACCESS | view_flag(view))
            .during(OPEN_FOR_DELETE_TREE)
        {
            Ok(key) => self.handle(key, root, path),
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err),
        };
        self.platform
            .delete_tree(KeyRef::Handle(key.raw()), None)
            .during(DELETE_TREE)
    }

    /// Move a node with all its values and descendants.
    ///
    /// The destination is created if needed and existing values there are
    /// overwritten. Moving a node into itself fails with `InvalidParameter`.
    pub fn move_key(
        &self,
        source_root: RootKey,
        source_path: &str,
        dest_root: RootKey,
        dest_path: &str,
        view: View,
    ) -> StoreResult<()> {
        let source_path = require_path(source_path, OPEN_SOURCE)?;
        let dest_path = require_path(dest_path, CREATE_DESTINATION)?;
        if source_root == dest_root && is_within(source_path, dest_path) {
            return Err(StoreError::from_status(COPY_KEY, PlatformStatus::InvalidParameter));
        }

        let source = NodePath::new(source_root, source_path);
        let dest = NodePath::new(dest_root, dest_path);

        if !view.is_forced() {
            let (key, _) = self
                .platform
                .create_key(KeyRef::Root(dest_root), dest_path, AccessMask::ALL_ACCESS)
                .during(CREATE_DESTINATION)?;
            let dest_key = self.handle(key, dest_root, dest_path);
            self.platform
                .copy_tree(KeyRef::Root(source_root), Some(source_path), dest_key.raw())
                .during(COPY_KEY)?;
            drop(dest_key);
            return self
                .remove_source(KeyRef::Root(source_root), Some(source_path), source_root, source_path, view)
                .inspect_err(|err| warn_partial_move(&source, &dest, err));
        }

        let access = AccessMask::ALL_ACCESS | view_flag(view);
        // Guards drop in reverse order of declaration on every exit path.
        let source_key = {
            let key = self
                .platform
                .open_key(KeyRef::Root(source_root), source_path, access)
                .during(OPEN_SOURCE)?;
            self.handle(key, source_root, source_path)
        };
        let dest_key = {
            let (key, _) = self
                .platform
                .create_key(KeyRef::Root(dest_root), dest_path, access)
                .during(CREATE_DESTINATION)?;
            self.handle(key, dest_root, dest_path)
        };

        self.platform
            .copy_tree(KeyRef::Handle(source_key.raw()), None, dest_key.raw())
            .during(COPY_KEY)?;
        self.remove_source(KeyRef::Handle(source_key.raw()), None, source_root, source_path, view)
            .inspect_err(|err| warn_partial_move(&source, &dest, err))
    }

    fn remove_source(
        &self,
        tree_parent: KeyRef,
        tree_path: Option<&str>,
        root: RootKey,
        path: &str,
        view: View,
    ) -> StoreResult<()> {
        self.platform
            .delete_tree(tree_parent, tree_path)
            .during(CLEAN_UP_TREE)?;
        self.platform
            .delete_key(KeyRef::Root(root), path, view_flag(view))
            .during(CLEAN_UP_KEY)
    }

    /// Open a dedicated handle on a node and wrap it in a [`ChangeMonitor`].
    ///
    /// Fails with `Configuration` if `events` is empty and with `NotFound`
    /// if the node does not exist.
    pub fn monitor_key(
        &self,
        root: RootKey,
        path: &str,
        events: &[EventFlag],
        recursive: bool,
        view: View,
    ) -> StoreResult<ChangeMonitor> {
        notify_filter(events)?;
        let path = require_path(path, OPEN_FOR_MONITOR)?;
        let key = self
            .platform
            .open_key(KeyRef::Root(root), path, resolve_access_flags(false, view))
            .during(OPEN_FOR_MONITOR)?;
        Ok(ChangeMonitor::new(
            self.handle(key, root, path),
            events.to_vec(),
            recursive,
        ))
    }
}

fn warn_partial_move(source: &NodePath, dest: &NodePath, err: &StoreError) {
    warn!(
        %source,
        %dest,
        error = %err,
        "move copied the data but could not remove the source; data now exists in both places"
    );
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

//! In-process emulation of the hierarchical store.
//!
//! [`MemoryPlatform`] keeps one node tree per root and namespace behind a
//! single `RwLock`, hands out numbered handles carrying the access rights
//! they were opened with, and delivers change notifications by setting the
//! [`WaitableSignal`] of each matching subscription exactly once.
//!
//! Notification scope follows the native store: adding or removing a child
//! is a `CHANGE_NAME` change on the parent, writing or deleting a value is a
//! `CHANGE_LAST_SET` change on the node holding it. A shallow subscription
//! sees changes on its own node, a subtree subscription sees changes on its
//! node and every descendant. Deleting a watched node fires its
//! subscriptions regardless of filter.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hivekit_types::path;
use hivekit_types::{AccessMask, Bitness, NotifyFilter, RootKey, ValueKind};
use tracing::trace;

use crate::config::PlatformConfig;
use crate::signal::WaitableSignal;
use crate::snapshot::{NodeSnapshot, SnapshotError, StoreSnapshot, ValueSnapshot, ViewSnapshot};
use crate::status::{PlatformResult, PlatformStatus};
use crate::traits::{Disposition, KeyInfo, KeyRef, PlatformStore, RawKey, RawValue};

/// Longest accepted node name, in characters.
pub const MAX_KEY_NAME_LENGTH: usize = 255;
/// Longest accepted value name, in characters.
pub const MAX_VALUE_NAME_LENGTH: usize = 16_383;

type NodeId = u64;

/// Names of the [`PlatformStore`] primitives, used to inject faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    OpenKey,
    CreateKey,
    CloseKey,
    DeleteKey,
    DeleteTree,
    CopyTree,
    QueryValue,
    SetValue,
    DeleteValue,
    EnumKey,
    EnumValue,
    QueryInfo,
    NotifyChange,
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn validate_key_name(name: &str) -> PlatformResult<()> {
    if name.chars().count() > MAX_KEY_NAME_LENGTH {
        return Err(PlatformStatus::InvalidParameter);
    }
    Ok(())
}

fn validate_value_name(name: &str) -> PlatformResult<()> {
    if name.chars().count() > MAX_VALUE_NAME_LENGTH {
        return Err(PlatformStatus::InvalidParameter);
    }
    Ok(())
}

fn has_components(path: &str) -> bool {
    path::components(path).next().is_some()
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    /// Keyed by case-folded name.
    children: BTreeMap<String, NodeId>,
    /// Insertion order; names compare case-insensitively.
    values: Vec<(String, RawValue)>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: BTreeMap::new(),
            values: Vec::new(),
        }
    }

    fn value_index(&self, name: &str) -> Option<usize> {
        let folded = fold(name);
        self.values.iter().position(|(n, _)| fold(n) == folded)
    }

    fn upsert_value(&mut self, name: &str, value: RawValue) {
        match self.value_index(name) {
            Some(idx) => self.values[idx].1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }
}

#[derive(Debug)]
struct HandleEntry {
    node: NodeId,
    access: AccessMask,
    /// Index and folded name of the child last returned by `enum_key`.
    cursor: Option<(usize, String)>,
}

struct Subscription {
    key: RawKey,
    node: NodeId,
    filter: NotifyFilter,
    subtree: bool,
    signal: WaitableSignal,
}

struct State {
    nodes: HashMap<NodeId, Node>,
    roots: BTreeMap<(RootKey, Bitness), NodeId>,
    handles: HashMap<RawKey, HandleEntry>,
    subscriptions: Vec<Subscription>,
    next_node: NodeId,
    next_handle: u64,
}

impl State {
    fn new(config: &PlatformConfig) -> Self {
        let mut state = Self {
            nodes: HashMap::new(),
            roots: BTreeMap::new(),
            handles: HashMap::new(),
            subscriptions: Vec::new(),
            next_node: 1,
            next_handle: 0x100,
        };
        let namespaces: &[Bitness] = if config.dual_view {
            &[Bitness::Bits32, Bitness::Bits64]
        } else {
            std::slice::from_ref(&config.native_bitness)
        };
        for root in RootKey::ALL {
            for &bitness in namespaces {
                let id = state.alloc_node(Node::new(root.full_name(), None));
                state.roots.insert((root, bitness), id);
            }
        }
        state
    }

    fn alloc_node(&mut self, node: Node) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id, node);
        id
    }

    fn node(&self, id: NodeId) -> PlatformResult<&Node> {
        self.nodes.get(&id).ok_or(PlatformStatus::KeyDeleted)
    }

    fn node_mut(&mut self, id: NodeId) -> PlatformResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(PlatformStatus::KeyDeleted)
    }

    fn resolve(&self, parent: KeyRef, bitness: Bitness) -> PlatformResult<(NodeId, AccessMask)> {
        match parent {
            KeyRef::Root(root) => self
                .roots
                .get(&(root, bitness))
                .map(|&id| (id, AccessMask::ALL_ACCESS))
                .ok_or(PlatformStatus::InvalidHandle),
            KeyRef::Handle(key) => {
                let entry = self.handles.get(&key).ok_or(PlatformStatus::InvalidHandle)?;
                self.node(entry.node)?;
                Ok((entry.node, entry.access))
            }
        }
    }

    fn handle_node(&self, key: RawKey, required: AccessMask) -> PlatformResult<NodeId> {
        let entry = self.handles.get(&key).ok_or(PlatformStatus::InvalidHandle)?;
        if !entry.access.allows(required) {
            return Err(PlatformStatus::AccessDenied);
        }
        self.node(entry.node)?;
        Ok(entry.node)
    }

    /// Resolve `parent` + optional path. A missing or empty path targets
    /// `parent` itself, which for a handle requires `direct_access`.
    fn target(
        &self,
        parent: KeyRef,
        path: Option<&str>,
        bitness: Bitness,
        direct_access: AccessMask,
    ) -> PlatformResult<NodeId> {
        match (parent, path.filter(|p| has_components(p))) {
            (_, Some(p)) => {
                let (start, _) = self.resolve(parent, bitness)?;
                self.lookup(start, p)
            }
            (KeyRef::Handle(key), None) => self.handle_node(key, direct_access),
            (KeyRef::Root(_), None) => Ok(self.resolve(parent, bitness)?.0),
        }
    }

    fn child(&self, id: NodeId, name: &str) -> PlatformResult<Option<NodeId>> {
        Ok(self.node(id)?.children.get(&fold(name)).copied())
    }

    fn lookup(&self, start: NodeId, path: &str) -> PlatformResult<NodeId> {
        let mut current = start;
        for component in path::components(path) {
            validate_key_name(component)?;
            current = self
                .child(current, component)?
                .ok_or(PlatformStatus::FileNotFound)?;
        }
        Ok(current)
    }

    fn insert_child(&mut self, parent: NodeId, name: &str) -> PlatformResult<NodeId> {
        self.node(parent)?;
        let id = self.alloc_node(Node::new(name, Some(parent)));
        self.node_mut(parent)?.children.insert(fold(name), id);
        self.fire(parent, NotifyFilter::CHANGE_NAME);
        Ok(id)
    }

    fn open_handle(&mut self, node: NodeId, access: AccessMask) -> RawKey {
        let key = RawKey::from_raw(self.next_handle);
        self.next_handle += 4;
        self.handles.insert(
            key,
            HandleEntry {
                node,
                access,
                cursor: None,
            },
        );
        key
    }

    fn is_within(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Set and drop every subscription a `change` on `node` satisfies.
    fn fire(&mut self, node: NodeId, change: NotifyFilter) {
        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        subscriptions.retain(|sub| {
            let in_scope = sub.node == node || (sub.subtree && self.is_within(sub.node, node));
            if in_scope && sub.filter.intersects(change) {
                sub.signal.set();
                false
            } else {
                true
            }
        });
        self.subscriptions = subscriptions;
    }

    /// Drop `root` and its descendants from the arena. The caller unlinks
    /// `root` from its parent. Subscriptions on removed nodes fire.
    fn remove_subtree(&mut self, root: NodeId) -> usize {
        let mut removed = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children.values().copied());
                removed.insert(id);
            }
        }
        self.subscriptions.retain(|sub| {
            if removed.contains(&sub.node) {
                sub.signal.set();
                false
            } else {
                true
            }
        });
        removed.len()
    }

    fn delete_node(&mut self, id: NodeId) -> PlatformResult<()> {
        let node = self.node(id)?;
        // Roots have no parent and can never be deleted.
        let parent = node.parent.ok_or(PlatformStatus::AccessDenied)?;
        let folded = fold(&node.name);
        self.node_mut(parent)?.children.remove(&folded);
        self.remove_subtree(id);
        self.fire(parent, NotifyFilter::CHANGE_NAME);
        Ok(())
    }

    fn clear_node(&mut self, id: NodeId) -> PlatformResult<()> {
        let node = self.node_mut(id)?;
        let children: Vec<NodeId> = std::mem::take(&mut node.children).into_values().collect();
        let had_values = !node.values.is_empty();
        node.values.clear();

        let removed: usize = children.iter().map(|&child| self.remove_subtree(child)).sum();
        if !children.is_empty() {
            self.fire(id, NotifyFilter::CHANGE_NAME);
        }
        if had_values {
            self.fire(id, NotifyFilter::CHANGE_LAST_SET);
        }
        trace!(node = id, removed, "tree cleared");
        Ok(())
    }

    fn export(&self, id: NodeId) -> PlatformResult<NodeSnapshot> {
        let node = self.node(id)?;
        let values = node
            .values
            .iter()
            .map(|(name, value)| ValueSnapshot {
                name: name.clone(),
                kind: value.kind,
                data: value.data.clone(),
            })
            .collect();
        let children = node
            .children
            .values()
            .map(|&child| self.export(child))
            .collect::<PlatformResult<Vec<_>>>()?;
        Ok(NodeSnapshot {
            name: node.name.clone(),
            values,
            children,
        })
    }

    /// Merge `tree`'s values and descendants into `dest`.
    fn import(&mut self, dest: NodeId, tree: &NodeSnapshot) -> PlatformResult<()> {
        if !tree.values.is_empty() {
            let node = self.node_mut(dest)?;
            for value in &tree.values {
                validate_value_name(&value.name)?;
                node.upsert_value(&value.name, RawValue::new(value.kind, value.data.clone()));
            }
            self.fire(dest, NotifyFilter::CHANGE_LAST_SET);
        }
        for child in &tree.children {
            validate_key_name(&child.name)?;
            if !has_components(&child.name) || child.name.contains(['\\', '/']) {
                return Err(PlatformStatus::InvalidData);
            }
            let id = match self.child(dest, &child.name)? {
                Some(id) => id,
                None => self.insert_child(dest, &child.name)?,
            };
            self.import(id, child)?;
        }
        Ok(())
    }
}

/// In-memory [`PlatformStore`].
///
/// Intended for tests, tooling and embedding. Data lives until the platform
/// is dropped unless saved with
/// [`save_snapshot`](MemoryPlatform::save_snapshot).
pub struct MemoryPlatform {
    config: PlatformConfig,
    state: RwLock<State>,
    faults: Mutex<HashMap<Primitive, PlatformStatus>>,
}

impl MemoryPlatform {
    /// An empty dual-view platform with the host's native bitness.
    pub fn new() -> Self {
        Self::with_config(PlatformConfig::default())
    }

    pub fn with_config(config: PlatformConfig) -> Self {
        let state = State::new(&config);
        Self {
            config,
            state: RwLock::new(state),
            faults: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Number of handles opened and not yet closed.
    pub fn open_handle_count(&self) -> PlatformResult<usize> {
        Ok(self.read()?.handles.len())
    }

    /// Number of subscriptions registered and not yet fired or dropped.
    pub fn subscription_count(&self) -> PlatformResult<usize> {
        Ok(self.read()?.subscriptions.len())
    }

    /// Make the next call to `primitive` fail with `status`.
    pub fn inject_fault(&self, primitive: Primitive, status: PlatformStatus) -> PlatformResult<()> {
        self.faults
            .lock()
            .map_err(|_| PlatformStatus::RegistryCorrupt)?
            .insert(primitive, status);
        Ok(())
    }

    /// Capture every namespace tree.
    pub fn snapshot(&self) -> PlatformResult<StoreSnapshot> {
        let state = self.read()?;
        let views = state
            .roots
            .iter()
            .map(|(&(root, bitness), &id)| {
                Ok(ViewSnapshot {
                    root,
                    bitness,
                    tree: state.export(id)?,
                })
            })
            .collect::<PlatformResult<Vec<_>>>()?;
        Ok(StoreSnapshot {
            config: self.config.clone(),
            views,
        })
    }

    /// Build a platform holding the trees in `snapshot`.
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Result<Self, SnapshotError> {
        let platform = Self::with_config(snapshot.config.clone());
        {
            let mut state = platform.write()?;
            for view in &snapshot.views {
                let id = state
                    .roots
                    .get(&(view.root, view.bitness))
                    .copied()
                    .ok_or_else(|| {
                        SnapshotError::Inconsistent(format!(
                            "{} has no {} namespace on this platform",
                            view.root, view.bitness
                        ))
                    })?;
                state.import(id, &view.tree)?;
            }
        }
        Ok(platform)
    }

    fn read(&self) -> PlatformResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| PlatformStatus::RegistryCorrupt)
    }

    fn write(&self) -> PlatformResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| PlatformStatus::RegistryCorrupt)
    }

    fn fault(&self, primitive: Primitive) -> PlatformResult<()> {
        let injected = self
            .faults
            .lock()
            .map_err(|_| PlatformStatus::RegistryCorrupt)?
            .remove(&primitive);
        match injected {
            Some(status) => {
                trace!(?primitive, %status, "injected fault");
                Err(status)
            }
            None => Ok(()),
        }
    }

    /// The namespace selected by the view bits of `access`.
    fn namespace(&self, access: AccessMask) -> PlatformResult<Bitness> {
        let view = access & AccessMask::VIEW_MASK;
        if view == AccessMask::VIEW_MASK {
            return Err(PlatformStatus::InvalidParameter);
        }
        if !self.config.dual_view || view.is_empty() {
            return Ok(self.config.native_bitness);
        }
        if view == AccessMask::WOW64_32KEY {
            Ok(Bitness::Bits32)
        } else {
            Ok(Bitness::Bits64)
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (nodes, handles) = self
            .read()
            .map(|s| (s.nodes.len(), s.handles.len()))
            .unwrap_or_default();
        f.debug_struct("MemoryPlatform")
            .field("config", &self.config)
            .field("node_count", &nodes)
            .field("handle_count", &handles)
            .finish()
    }
}

impl PlatformStore for MemoryPlatform {
    fn open_key(&self, parent: KeyRef, path: &str, access: AccessMask) -> PlatformResult<RawKey> {
        self.fault(Primitive::OpenKey)?;
        let bitness = self.namespace(access)?;
        let mut state = self.write()?;
        let (start, _) = state.resolve(parent, bitness)?;
        let node = state.lookup(start, path)?;
        let key = state.open_handle(node, access.rights());
        trace!(?key, path, "key opened");
        Ok(key)
    }

    fn create_key(
        &self,
        parent: KeyRef,
        path: &str,
        access: AccessMask,
    ) -> PlatformResult<(RawKey, Disposition)> {
        self.fault(Primitive::CreateKey)?;
        let bitness = self.namespace(access)?;
        let mut state = self.write()?;
        let (mut current, parent_access) = state.resolve(parent, bitness)?;
        let mut disposition = Disposition::OpenedExisting;
        for component in path::components(path) {
            validate_key_name(component)?;
            current = match state.child(current, component)? {
                Some(id) => {
                    disposition = Disposition::OpenedExisting;
                    id
                }
                None => {
                    if !parent_access.allows(AccessMask::CREATE_SUB_KEY) {
                        return Err(PlatformStatus::AccessDenied);
                    }
                    disposition = Disposition::CreatedNew;
                    state.insert_child(current, component)?
                }
            };
        }
        let key = state.open_handle(current, access.rights());
        trace!(?key, path, ?disposition, "key created");
        Ok((key, disposition))
    }

    fn close_key(&self, key: RawKey) -> PlatformResult<()> {
        self.fault(Primitive::CloseKey)?;
        let mut state = self.write()?;
        state.handles.remove(&key).ok_or(PlatformStatus::InvalidHandle)?;
        state.subscriptions.retain(|sub| sub.key != key);
        trace!(?key, "key closed");
        Ok(())
    }

    fn delete_key(&self, parent: KeyRef, path: &str, view: AccessMask) -> PlatformResult<()> {
        self.fault(Primitive::DeleteKey)?;
        if !has_components(path) {
            return Err(PlatformStatus::InvalidParameter);
        }
        let bitness = self.namespace(view & AccessMask::VIEW_MASK)?;
        let mut state = self.write()?;
        let (start, _) = state.resolve(parent, bitness)?;
        let node = state.lookup(start, path)?;
        if !state.node(node)?.children.is_empty() {
            return Err(PlatformStatus::AccessDenied);
        }
        state.delete_node(node)
    }

    fn delete_tree(&self, parent: KeyRef, path: Option<&str>) -> PlatformResult<()> {
        self.fault(Primitive::DeleteTree)?;
        let bitness = self.namespace(AccessMask::empty())?;
        let mut state = self.write()?;
        let target = state.target(
            parent,
            path,
            bitness,
            AccessMask::DELETE | AccessMask::ENUMERATE_SUB_KEYS | AccessMask::SET_VALUE,
        )?;
        state.clear_node(target)
    }

    fn copy_tree(
        &self,
        source: KeyRef,
        source_path: Option<&str>,
        dest: RawKey,
    ) -> PlatformResult<()> {
        self.fault(Primitive::CopyTree)?;
        let bitness = self.namespace(AccessMask::empty())?;
        let mut state = self.write()?;
        let dest_node = state.handle_node(dest, AccessMask::WRITE)?;
        let source_node = state.target(source, source_path, bitness, AccessMask::READ)?;
        // Export first so copying a node into its own subtree terminates.
        let tree = state.export(source_node)?;
        state.import(dest_node, &tree)
    }

    fn query_value(&self, key: RawKey, name: &str) -> PlatformResult<RawValue> {
        self.fault(Primitive::QueryValue)?;
        validate_value_name(name)?;
        let state = self.read()?;
        let node = state.node(state.handle_node(key, AccessMask::QUERY_VALUE)?)?;
        node.value_index(name)
            .map(|idx| node.values[idx].1.clone())
            .ok_or(PlatformStatus::FileNotFound)
    }

    fn set_value(&self, key: RawKey, name: &str, value: RawValue) -> PlatformResult<()> {
        self.fault(Primitive::SetValue)?;
        validate_value_name(name)?;
        let mut state = self.write()?;
        let id = state.handle_node(key, AccessMask::SET_VALUE)?;
        state.node_mut(id)?.upsert_value(name, value);
        state.fire(id, NotifyFilter::CHANGE_LAST_SET);
        Ok(())
    }

    fn delete_value(&self, key: RawKey, name: &str) -> PlatformResult<()> {
        self.fault(Primitive::DeleteValue)?;
        validate_value_name(name)?;
        let mut state = self.write()?;
        let id = state.handle_node(key, AccessMask::SET_VALUE)?;
        let node = state.node_mut(id)?;
        let idx = node.value_index(name).ok_or(PlatformStatus::FileNotFound)?;
        node.values.remove(idx);
        state.fire(id, NotifyFilter::CHANGE_LAST_SET);
        Ok(())
    }

    fn enum_key(&self, key: RawKey, index: usize) -> PlatformResult<Option<String>> {
        self.fault(Primitive::EnumKey)?;
        let mut state = self.write()?;
        let id = state.handle_node(key, AccessMask::ENUMERATE_SUB_KEYS)?;
        // Sequential enumeration resumes after the previous child instead of
        // walking from the start.
        let resume = state
            .handles
            .get(&key)
            .and_then(|entry| entry.cursor.clone())
            .filter(|(last, _)| last.checked_add(1) == Some(index));
        let node = state.node(id)?;
        let next = match resume {
            Some((_, after)) => node
                .children
                .range::<String, _>((Bound::Excluded(after), Bound::Unbounded))
                .next(),
            None => node.children.iter().nth(index),
        }
        .map(|(folded, &child)| (folded.clone(), child));

        let Some((folded, child)) = next else {
            return Ok(None);
        };
        let name = state.node(child)?.name.clone();
        if let Some(entry) = state.handles.get_mut(&key) {
            entry.cursor = Some((index, folded));
        }
        Ok(Some(name))
    }

    fn enum_value(&self, key: RawKey, index: usize) -> PlatformResult<Option<(String, ValueKind)>> {
        self.fault(Primitive::EnumValue)?;
        let state = self.read()?;
        let node = state.node(state.handle_node(key, AccessMask::QUERY_VALUE)?)?;
        Ok(node
            .values
            .get(index)
            .map(|(name, value)| (name.clone(), value.kind)))
    }

    fn query_info(&self, key: RawKey) -> PlatformResult<KeyInfo> {
        self.fault(Primitive::QueryInfo)?;
        let state = self.read()?;
        let node = state.node(state.handle_node(key, AccessMask::QUERY_VALUE)?)?;
        let max_sub_key_len = node
            .children
            .values()
            .filter_map(|id| state.nodes.get(id))
            .map(|child| child.name.chars().count())
            .max()
            .unwrap_or(0);
        let max_value_name_len = node
            .values
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0);
        Ok(KeyInfo {
            sub_keys: node.children.len(),
            values: node.values.len(),
            max_sub_key_len,
            max_value_name_len,
        })
    }

    fn notify_change(
        &self,
        key: RawKey,
        filter: NotifyFilter,
        watch_subtree: bool,
        signal: &WaitableSignal,
    ) -> PlatformResult<()> {
        self.fault(Primitive::NotifyChange)?;
        if filter.is_empty() {
            return Err(PlatformStatus::InvalidParameter);
        }
        let mut state = self.write()?;
        let node = state.handle_node(key, AccessMask::NOTIFY)?;
        signal.reset();
        state.subscriptions.push(Subscription {
            key,
            node,
            filter,
            subtree: watch_subtree,
            signal: signal.clone(),
        });
        trace!(?key, ?filter, watch_subtree, "change subscription registered");
        Ok(())
    }
}

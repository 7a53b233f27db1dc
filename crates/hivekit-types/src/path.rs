//! Node addressing.
//!
//! A node is addressed by a [`RootKey`] plus a relative path. Callers may use
//! either `/` or `\` between components; paths are normalised to `\` with empty
//! components dropped, so `Software//Foo/` and `Software\Foo` name the same
//! node.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;
use crate::root::RootKey;

/// Separator used in normalised paths.
pub const PATH_SEPARATOR: char = '\\';

/// Split a relative path into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['\\', '/']).filter(|c| !c.is_empty())
}

/// Normalise a relative path: `\` separators, no empty components.
pub fn normalize(path: &str) -> String {
    components(path).collect::<Vec<_>>().join("\\")
}

/// A root plus a normalised relative path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodePath {
    root: RootKey,
    subkey: String,
}

impl NodePath {
    /// Build a path under `root`. The subkey is normalised; it may be empty,
    /// in which case the path names the root itself.
    pub fn new(root: RootKey, subkey: &str) -> Self {
        Self {
            root,
            subkey: normalize(subkey),
        }
    }

    pub fn root(&self) -> RootKey {
        self.root
    }

    /// The normalised relative path (empty for the root itself).
    pub fn subkey(&self) -> &str {
        &self.subkey
    }

    /// Returns `true` if this path names the root itself.
    pub fn is_root(&self) -> bool {
        self.subkey.is_empty()
    }

    /// Fail unless the path names a concrete node below the root.
    pub fn require_node(&self) -> Result<&str, TypeError> {
        if self.is_root() {
            return Err(TypeError::InvalidPath {
                path: self.to_string(),
                reason: "path must name a node below the root".into(),
            });
        }
        Ok(&self.subkey)
    }

    /// A path one level deeper.
    pub fn join(&self, child: &str) -> Self {
        let joined = if self.subkey.is_empty() {
            normalize(child)
        } else {
            let child = normalize(child);
            if child.is_empty() {
                self.subkey.clone()
            } else {
                format!("{}\\{}", self.subkey, child)
            }
        };
        Self {
            root: self.root,
            subkey: joined,
        }
    }

    /// The parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let parent = match self.subkey.rfind(PATH_SEPARATOR) {
            Some(idx) => self.subkey[..idx].to_string(),
            None => String::new(),
        };
        Some(Self {
            root: self.root,
            subkey: parent,
        })
    }

    /// Last component, or `None` at the root.
    pub fn leaf(&self) -> Option<&str> {
        components(&self.subkey).last()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subkey.is_empty() {
            write!(f, "{}", self.root)
        } else {
            write!(f, "{}\\{}", self.root, self.subkey)
        }
    }
}

impl FromStr for NodePath {
    type Err = TypeError;

    /// Parse `HKCU\Software\Foo` (or with `/`, or with a full root name).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches(['\\', '/']);
        let (root, rest) = match trimmed.find(['\\', '/']) {
            Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
            None => (trimmed, ""),
        };
        if root.is_empty() {
            return Err(TypeError::InvalidPath {
                path: s.to_string(),
                reason: "missing root key".into(),
            });
        }
        Ok(Self::new(root.parse()?, rest))
    }
}

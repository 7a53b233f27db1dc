//! Foundation types for hivekit.
//!
//! This crate provides the vocabulary shared by every other hivekit crate:
//! how a node is addressed, which namespace view an operation targets, which
//! access rights a handle carries, and what a stored value looks like.
//!
//! # Key Types
//!
//! - [`RootKey`] — One of the well-known store roots (`HKCU`, `HKLM`, ...)
//! - [`NodePath`] — A root plus a normalised relative path
//! - [`View`] — Default / forced 32-bit / forced 64-bit namespace selection
//! - [`AccessMask`] — Rights requested when opening or creating a node
//! - [`NotifyFilter`] / [`EventFlag`] — Change-notification filters
//! - [`Value`] / [`ValueKind`] — Typed values and their type tags

pub mod access;
pub mod error;
pub mod event;
pub mod path;
pub mod root;
pub mod value;
pub mod view;

pub use access::{AccessMask, NotifyFilter};
pub use error::TypeError;
pub use event::EventFlag;
pub use path::{NodePath, PATH_SEPARATOR};
pub use root::RootKey;
pub use value::{Value, ValueKind};
pub use view::{Bitness, View};

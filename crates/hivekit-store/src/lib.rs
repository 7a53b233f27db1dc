//! Typed access to a hierarchical configuration store.
//!
//! This crate sits on top of a [`PlatformStore`](hivekit_platform::PlatformStore)
//! and turns its handle-and-status primitives into owned handles, typed
//! values and descriptive errors.
//!
//! # Components
//!
//! - [`Registry`] — Create, open, delete, move and monitor nodes
//! - [`StoreHandle`] — One open node: typed reads and writes, enumeration
//! - [`ChangeMonitor`] — Arm/rearm change notification on one node
//! - [`resolve_access_flags`] — Map a [`View`](hivekit_types::View) to access bits
//! - [`codec`] — Byte encoding of [`Value`](hivekit_types::Value)s
//!
//! # Error Policy
//!
//! 1. Every platform failure is reported with the name of the operation it
//!    happened in.
//! 2. Deleting something that does not exist succeeds. Every other delete
//!    failure, including access denied, is surfaced.
//! 3. Reading a value with the wrong typed reader is an error, never a
//!    conversion.
//! 4. Nothing is retried internally.

pub mod codec;
pub mod error;
pub mod handle;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod view;

pub use error::{StoreError, StoreResult};
pub use handle::StoreHandle;
pub use monitor::{ChangeMonitor, MonitorState};
pub use registry::Registry;
pub use report::{error_chain, report_error};
pub use view::{resolve_access_flags, view_flag};

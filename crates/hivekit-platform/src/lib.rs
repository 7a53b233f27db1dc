//! Platform store API for hivekit.
//!
//! The hierarchical store itself belongs to the operating system. This crate
//! defines the narrow set of primitives hivekit needs from it (the
//! [`PlatformStore`] trait) and ships [`MemoryPlatform`], an in-process
//! emulation with the same contract. Handles carry access masks, roots exist
//! in two parallel namespace views, and change subscriptions fire once
//! through [`WaitableSignal`]s. Status codes match the native API.
//!
//! # Modules
//!
//! - [`status`] — [`PlatformStatus`] codes returned by every primitive
//! - [`traits`] — The [`PlatformStore`] trait and its handle/value types
//! - [`signal`] — [`WaitableSignal`], the waitable object set by subscriptions
//! - [`config`] — [`PlatformConfig`] for the emulation
//! - [`memory`] — [`MemoryPlatform`]
//! - [`snapshot`] — Saving and restoring a [`MemoryPlatform`] as JSON

pub mod config;
pub mod memory;
pub mod signal;
pub mod snapshot;
pub mod status;
pub mod traits;

pub use config::PlatformConfig;
pub use memory::{MemoryPlatform, Primitive, MAX_KEY_NAME_LENGTH, MAX_VALUE_NAME_LENGTH};
pub use signal::WaitableSignal;
pub use snapshot::{NodeSnapshot, SnapshotError, StoreSnapshot, ViewSnapshot};
pub use status::{PlatformResult, PlatformStatus};
pub use traits::{Disposition, KeyInfo, KeyRef, PlatformStore, RawKey, RawValue};

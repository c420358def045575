//! # Store Traits
//!
//! Seam traits between the sync engine and its storage collaborators.
//!
//! The engine never talks to a concrete remote API or settings backend
//! directly; hosts and provider crates supply implementations of:
//!
//! - [`RemoteCollection`]: a keyed-document remote store scoped under an
//!   authenticated principal (paginated listing, per-document merge upserts,
//!   deletes).
//! - [`SettingsStore`]: a small persisted key-value store for engine
//!   configuration that must survive process restarts.

pub mod error;
pub mod memory;
pub mod remote;
pub mod settings;

pub use error::{Result, StoreError};
pub use memory::MemorySettingsStore;
pub use remote::{RemoteCollection, RemoteDocument};
pub use settings::SettingsStore;

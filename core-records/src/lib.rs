//! # Record Domain Module
//!
//! Local persistence and domain model for customer lead records:
//! - `LeadRecord` model with identity and corruption invariants
//! - `LeadStatus` closed vocabulary plus legacy-value normalization
//! - SQLite connection pooling with embedded migrations
//! - Repository traits and SQLite implementations

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod status;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{RecordsError, Result};
pub use models::{LeadRecord, RecordId};
pub use repositories::{
    IdentityRow, RecordRepository, SqliteRecordRepository, SqliteSettingsStore,
    ARCHIVE_COLLECTION, PRIMARY_COLLECTION,
};
pub use status::LeadStatus;

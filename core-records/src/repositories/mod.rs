//! Repository traits and SQLite implementations.

mod record;
mod settings;

pub use record::{IdentityRow, RecordRepository, SqliteRecordRepository};
pub use settings::SqliteSettingsStore;

/// Collection name for the primary lead records.
pub const PRIMARY_COLLECTION: &str = "records";

/// Collection name for the secondary (archive) record collection.
pub const ARCHIVE_COLLECTION: &str = "archive";

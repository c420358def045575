//! Record repository trait and SQLite implementation.

use crate::error::Result;
use crate::models::{LeadRecord, RecordId};
use crate::status::LeadStatus;
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};
use tracing::warn;
use uuid::Uuid;

/// Minimal projection of a stored row used for corruption checks.
///
/// The id is the raw TEXT column value: corrupt rows may hold ids that do
/// not parse as UUIDs, which the full [`LeadRecord`] model cannot represent.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub id: String,
    pub name: String,
    pub address: String,
}

impl IdentityRow {
    /// True when the row fails the record invariants (unparseable id, or no
    /// identity-bearing content).
    pub fn is_corrupt(&self) -> bool {
        Uuid::parse_str(&self.id).is_err()
            || (self.name.trim().is_empty() && self.address.trim().is_empty())
    }
}

/// Record repository interface for local-store data access.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Find a record by its id.
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<LeadRecord>>;

    /// Fetch all well-formed records in this collection.
    ///
    /// Rows that cannot be mapped to the model (e.g. corrupt ids) are
    /// skipped with a warning; the sweeper removes them separately.
    async fn list_all(&self) -> Result<Vec<LeadRecord>>;

    /// Count records in this collection.
    async fn count(&self) -> Result<i64>;

    /// Insert-or-update a record in one transactional statement.
    async fn save(&self, record: &LeadRecord) -> Result<()>;

    /// Delete a record by id.
    ///
    /// Returns `true` if a row was removed.
    async fn delete(&self, id: &RecordId) -> Result<bool>;

    /// Record that the content modified at `uploaded_at` has reached the
    /// remote store, setting `remote_modified_at` to that timestamp.
    ///
    /// Guarded on `local_modified_at` still equalling `uploaded_at`: a
    /// concurrent application edit bumps the modification time, the update
    /// matches no row and the record stays dirty for the next pass. No other
    /// column is touched.
    async fn set_remote_watermark(&self, id: &RecordId, uploaded_at: i64) -> Result<()>;

    /// Fetch the identity projection of every row, including corrupt ones.
    async fn identity_rows(&self) -> Result<Vec<IdentityRow>>;

    /// Delete a row by its raw TEXT id (corrupt rows have no [`RecordId`]).
    async fn delete_raw(&self, raw_id: &str) -> Result<bool>;
}

/// Raw row shape as stored; converted to [`LeadRecord`] after id parsing.
#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    name: String,
    address: String,
    phone: String,
    email: String,
    notes: String,
    status: String,
    amount: Option<f64>,
    created_at: i64,
    local_modified_at: i64,
    remote_modified_at: Option<i64>,
    follow_up_date: Option<i64>,
    last_contact_date: Option<i64>,
}

impl RecordRow {
    fn into_record(self) -> Option<LeadRecord> {
        let id = match RecordId::from_string(&self.id) {
            Ok(id) => id,
            Err(_) => {
                warn!(raw_id = %self.id, "Skipping record row with unparseable id");
                return None;
            }
        };
        Some(LeadRecord {
            id,
            name: self.name,
            address: self.address,
            phone: self.phone,
            email: self.email,
            notes: self.notes,
            status: LeadStatus::normalize(&self.status),
            amount: self.amount,
            created_at: self.created_at,
            local_modified_at: self.local_modified_at,
            remote_modified_at: self.remote_modified_at,
            follow_up_date: self.follow_up_date,
            last_contact_date: self.last_contact_date,
        })
    }
}

/// SQLite implementation of [`RecordRepository`], scoped to one collection.
///
/// The primary lead collection and the secondary archive collection share
/// the same table and schema; each repository handle only sees rows in its
/// own collection.
pub struct SqliteRecordRepository {
    pool: SqlitePool,
    collection: String,
}

impl SqliteRecordRepository {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    /// Collection this repository is scoped to.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl RecordRepository for SqliteRecordRepository {
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<LeadRecord>> {
        let row = query_as::<_, RecordRow>(
            "SELECT id, name, address, phone, email, notes, status, amount, \
             created_at, local_modified_at, remote_modified_at, follow_up_date, last_contact_date \
             FROM records WHERE id = ? AND collection = ?",
        )
        .bind(id.to_string())
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(RecordRow::into_record))
    }

    async fn list_all(&self) -> Result<Vec<LeadRecord>> {
        let rows = query_as::<_, RecordRow>(
            "SELECT id, name, address, phone, email, notes, status, amount, \
             created_at, local_modified_at, remote_modified_at, follow_up_date, last_contact_date \
             FROM records WHERE collection = ? ORDER BY created_at",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(RecordRow::into_record).collect())
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) =
            query_as("SELECT COUNT(*) FROM records WHERE collection = ?")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn save(&self, record: &LeadRecord) -> Result<()> {
        query(
            r#"
            INSERT INTO records (
                id, name, address, phone, email, notes, status, amount,
                created_at, local_modified_at, remote_modified_at,
                follow_up_date, last_contact_date, collection
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                phone = excluded.phone,
                email = excluded.email,
                notes = excluded.notes,
                status = excluded.status,
                amount = excluded.amount,
                local_modified_at = excluded.local_modified_at,
                remote_modified_at = excluded.remote_modified_at,
                follow_up_date = excluded.follow_up_date,
                last_contact_date = excluded.last_contact_date
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(&record.address)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.notes)
        .bind(record.status.as_str())
        .bind(record.amount)
        .bind(record.created_at)
        .bind(record.local_modified_at)
        .bind(record.remote_modified_at)
        .bind(record.follow_up_date)
        .bind(record.last_contact_date)
        .bind(&self.collection)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<bool> {
        self.delete_raw(&id.to_string()).await
    }

    async fn set_remote_watermark(&self, id: &RecordId, uploaded_at: i64) -> Result<()> {
        query(
            "UPDATE records SET remote_modified_at = ? \
             WHERE id = ? AND collection = ? AND local_modified_at = ?",
        )
        .bind(uploaded_at)
        .bind(id.to_string())
        .bind(&self.collection)
        .bind(uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn identity_rows(&self) -> Result<Vec<IdentityRow>> {
        let rows = query_as::<_, IdentityRow>(
            "SELECT id, name, address FROM records WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_raw(&self, raw_id: &str) -> Result<bool> {
        let result = query("DELETE FROM records WHERE id = ? AND collection = ?")
            .bind(raw_id)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

//! Database repository for value records.

use crate::db::{
    errors::Result,
    models::records::{ValueRecord, ValueRecordCreateDBRequest, ValueRecordDBResponse},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Records<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Records<'c> {
    /// Create a new Records repository instance
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Bulk insert records in a single statement, returning the number of rows written
    #[instrument(skip(self, records), fields(count = records.len()), err)]
    pub async fn create_many(&mut self, records: &[ValueRecordCreateDBRequest]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut source_names = Vec::with_capacity(records.len());
        let mut recorded_ats: Vec<DateTime<Utc>> = Vec::with_capacity(records.len());
        let mut execution_times = Vec::with_capacity(records.len());
        let mut values = Vec::with_capacity(records.len());
        for record in records {
            source_names.push(record.source_name.clone());
            recorded_ats.push(record.recorded_at);
            execution_times.push(record.execution_time);
            values.push(record.value);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO value_records (source_name, recorded_at, execution_time, value)
            SELECT * FROM UNNEST($1::text[], $2::timestamptz[], $3::float8[], $4::float8[])
            "#,
        )
        .bind(&source_names)
        .bind(&recorded_ats)
        .bind(&execution_times)
        .bind(&values)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every record stored under a source name
    #[instrument(skip(self), err)]
    pub async fn delete_by_source(&mut self, source_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM value_records WHERE source_name = $1")
            .bind(source_name)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// List the newest records for a source name, newest first
    #[instrument(skip(self), err)]
    pub async fn list_recent_by_source(&mut self, source_name: &str, limit: i64) -> Result<Vec<ValueRecordDBResponse>> {
        let records = sqlx::query_as::<_, ValueRecord>(
            r#"
            SELECT id, source_name, recorded_at, execution_time, value, created_at
            FROM value_records
            WHERE source_name = $1
            ORDER BY recorded_at DESC, id ASC
            LIMIT $2
            "#,
        )
        .bind(source_name)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(records)
    }
}

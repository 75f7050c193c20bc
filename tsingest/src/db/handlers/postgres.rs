//! PostgreSQL implementation of [`Repository`].

use crate::db::{
    errors::Result,
    handlers::{Records, Repository, Summaries},
    models::{
        records::{ValueRecordCreateDBRequest, ValueRecordDBResponse},
        summaries::{SummaryCreateDBRequest, SummaryDBResponse, SummaryFilter},
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

/// Repository backed by a PostgreSQL pool.
///
/// Single operations run on a pooled connection; [`Repository::replace`] runs all of its
/// statements in one transaction, so a failure or a dropped future rolls the whole swap back.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn add_records(&self, records: &[ValueRecordCreateDBRequest]) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Records::new(&mut conn).create_many(records).await
    }

    async fn add_summary(&self, summary: &SummaryCreateDBRequest) -> Result<SummaryDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Summaries::new(&mut conn).create(summary).await
    }

    async fn delete_records(&self, source_name: &str) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Records::new(&mut conn).delete_by_source(source_name).await
    }

    async fn delete_summary(&self, source_name: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Summaries::new(&mut conn).delete_by_source(source_name).await
    }

    async fn get_summary(&self, source_name: &str) -> Result<Option<SummaryDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Summaries::new(&mut conn).get_by_source(source_name).await
    }

    async fn list_summaries(&self, filter: &SummaryFilter) -> Result<Vec<SummaryDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Summaries::new(&mut conn).list(filter).await
    }

    async fn recent_records(&self, source_name: &str, limit: i64) -> Result<Vec<ValueRecordDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Records::new(&mut conn).list_recent_by_source(source_name, limit).await
    }

    #[instrument(skip(self, records, summary), fields(rows = records.len()), err)]
    async fn replace(
        &self,
        source_name: &str,
        records: &[ValueRecordCreateDBRequest],
        summary: &SummaryCreateDBRequest,
    ) -> Result<SummaryDBResponse> {
        let mut tx = self.pool.begin().await?;

        // A second replace of the same source waits here until this one commits, then
        // deletes what it wrote.
        Summaries::new(&mut tx).lock_source(source_name).await?;

        // Removing the summary cascades to its records; the explicit delete also clears
        // any records that were written without one.
        Summaries::new(&mut tx).delete_by_source(source_name).await?;
        Records::new(&mut tx).delete_by_source(source_name).await?;

        Records::new(&mut tx).create_many(records).await?;
        let created = Summaries::new(&mut tx).create(summary).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

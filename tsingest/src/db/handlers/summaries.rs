//! Database repository for per-source summaries.

use crate::db::{
    errors::Result,
    models::summaries::{Summary, SummaryCreateDBRequest, SummaryDBResponse, SummaryFilter},
};
use sqlx::{PgConnection, query_builder::QueryBuilder};
use tracing::instrument;

pub struct Summaries<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Summaries<'c> {
    /// Create a new Summaries repository instance
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Take a transaction-scoped lock on a source name.
    ///
    /// Held until the surrounding transaction ends, so concurrent replaces of one source
    /// run one after the other. Has no lasting effect outside a transaction.
    #[instrument(skip(self), err)]
    pub async fn lock_source(&mut self, source_name: &str) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(source_name)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    #[instrument(skip(self, request), fields(source_name = %request.source_name), err)]
    pub async fn create(&mut self, request: &SummaryCreateDBRequest) -> Result<SummaryDBResponse> {
        let summary = sqlx::query_as::<_, Summary>(
            r#"
            INSERT INTO summaries (
                source_name, time_span_seconds, first_operation_at, average_execution_time,
                average_value, median_value, max_value, min_value
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&request.source_name)
        .bind(request.time_span_seconds)
        .bind(request.first_operation_at)
        .bind(request.average_execution_time)
        .bind(request.average_value)
        .bind(request.median_value)
        .bind(request.max_value)
        .bind(request.min_value)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(summary)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_source(&mut self, source_name: &str) -> Result<Option<SummaryDBResponse>> {
        let summary = sqlx::query_as::<_, Summary>("SELECT * FROM summaries WHERE source_name = $1")
            .bind(source_name)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(summary)
    }

    /// Delete the summary for a source name. Its records go with it (ON DELETE CASCADE).
    #[instrument(skip(self), err)]
    pub async fn delete_by_source(&mut self, source_name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM summaries WHERE source_name = $1")
            .bind(source_name)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List summaries matching the filter, ordered by first operation then source name
    #[instrument(skip(self), err)]
    pub async fn list(&mut self, filter: &SummaryFilter) -> Result<Vec<SummaryDBResponse>> {
        let source_name = filter.effective_source_name();
        let before = filter.first_operation_before();

        let mut query = QueryBuilder::new("SELECT * FROM summaries WHERE 1=1");

        if let Some(name) = source_name {
            query.push(" AND source_name = ");
            query.push_bind(name);
        }
        if let Some(from) = filter.first_operation_from {
            query.push(" AND first_operation_at >= ");
            query.push_bind(from);
        }
        if let Some(before) = before {
            query.push(" AND first_operation_at < ");
            query.push_bind(before);
        }

        let ranges = [
            ("average_value >= ", filter.average_value_from),
            ("average_value <= ", filter.average_value_to),
            ("average_execution_time >= ", filter.average_execution_time_from),
            ("average_execution_time <= ", filter.average_execution_time_to),
        ];
        for (condition, bound) in ranges {
            if let Some(bound) = bound {
                query.push(" AND ");
                query.push(condition);
                query.push_bind(bound);
            }
        }

        query.push(" ORDER BY first_operation_at ASC, source_name ASC");

        let summaries = query.build_query_as::<Summary>().fetch_all(&mut *self.db).await?;

        Ok(summaries)
    }
}

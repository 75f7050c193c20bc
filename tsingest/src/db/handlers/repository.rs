//! Storage-agnostic repository trait for records and summaries.

use crate::db::{
    errors::Result,
    models::{
        records::{ValueRecordCreateDBRequest, ValueRecordDBResponse},
        summaries::{SummaryCreateDBRequest, SummaryDBResponse, SummaryFilter},
    },
};

/// Data access seam used by the ingestion and query services.
///
/// Implementations stamp `id` and `created_at` themselves. Records may only be stored
/// under a source name that has a summary by the time the write completes, and deleting a
/// summary deletes that source's records.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Insert a batch of records, returning the number stored
    async fn add_records(&self, records: &[ValueRecordCreateDBRequest]) -> Result<u64>;

    /// Insert one summary
    async fn add_summary(&self, summary: &SummaryCreateDBRequest) -> Result<SummaryDBResponse>;

    /// Delete all records for a source name. Deleting nothing is not an error.
    async fn delete_records(&self, source_name: &str) -> Result<u64>;

    /// Delete the summary (and, by cascade, the records) for a source name
    async fn delete_summary(&self, source_name: &str) -> Result<bool>;

    /// Fetch the summary for a source name
    async fn get_summary(&self, source_name: &str) -> Result<Option<SummaryDBResponse>>;

    /// List summaries matching a filter
    async fn list_summaries(&self, filter: &SummaryFilter) -> Result<Vec<SummaryDBResponse>>;

    /// The newest `limit` records for a source name, newest first
    async fn recent_records(&self, source_name: &str, limit: i64) -> Result<Vec<ValueRecordDBResponse>>;

    /// Atomically swap everything stored for a source name for a new batch and its summary
    async fn replace(
        &self,
        source_name: &str,
        records: &[ValueRecordCreateDBRequest],
        summary: &SummaryCreateDBRequest,
    ) -> Result<SummaryDBResponse>;

    /// Cheap liveness check against the backing store
    async fn health_check(&self) -> Result<()>;
}

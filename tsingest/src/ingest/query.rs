//! Read side: filtered summaries and recent records.

use std::sync::Arc;

use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::Repository,
    models::{
        records::ValueRecordDBResponse,
        summaries::{SummaryDBResponse, SummaryFilter},
    },
};

/// Number of records returned by [`QueryService::recent_records`] unless configured otherwise
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct QueryService {
    repository: Arc<dyn Repository>,
    recent_limit: u32,
}

impl QueryService {
    pub fn new(repository: Arc<dyn Repository>, recent_limit: u32) -> Self {
        Self {
            repository,
            recent_limit,
        }
    }

    /// Summaries matching the filter, oldest first operation first. An empty filter returns all.
    #[instrument(skip(self), err)]
    pub async fn summaries(&self, filter: &SummaryFilter) -> Result<Vec<SummaryDBResponse>> {
        self.repository.list_summaries(filter).await
    }

    /// The newest records for a source, newest first. A blank source name yields nothing.
    #[instrument(skip(self), err)]
    pub async fn recent_records(&self, source_name: &str) -> Result<Vec<ValueRecordDBResponse>> {
        if source_name.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.repository
            .recent_records(source_name, i64::from(self.recent_limit))
            .await
    }
}

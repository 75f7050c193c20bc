//! In-process implementation of [`Repository`] for local development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    handlers::Repository,
    models::{
        records::{ValueRecord, ValueRecordCreateDBRequest, ValueRecordDBResponse},
        summaries::{Summary, SummaryCreateDBRequest, SummaryDBResponse, SummaryFilter},
    },
};

#[derive(Default)]
struct MemoryState {
    summaries: HashMap<String, Summary>,
    records: HashMap<String, Vec<ValueRecord>>,
}

impl MemoryState {
    fn insert_summary(&mut self, request: &SummaryCreateDBRequest) -> Result<Summary> {
        if self.summaries.contains_key(&request.source_name) {
            return Err(DbError::UniqueViolation {
                constraint: Some("summaries_source_name_unique".to_string()),
                table: Some("summaries".to_string()),
                message: format!("summary for '{}' already exists", request.source_name),
            });
        }

        let summary = Summary {
            id: Uuid::new_v4(),
            source_name: request.source_name.clone(),
            time_span_seconds: request.time_span_seconds,
            first_operation_at: request.first_operation_at,
            average_execution_time: request.average_execution_time,
            average_value: request.average_value,
            median_value: request.median_value,
            max_value: request.max_value,
            min_value: request.min_value,
            created_at: Utc::now(),
        };
        self.summaries.insert(summary.source_name.clone(), summary.clone());
        Ok(summary)
    }

    fn insert_records(&mut self, requests: &[ValueRecordCreateDBRequest]) -> u64 {
        let created_at = Utc::now();
        for request in requests {
            self.records.entry(request.source_name.clone()).or_default().push(ValueRecord {
                id: Uuid::new_v4(),
                source_name: request.source_name.clone(),
                recorded_at: request.recorded_at,
                execution_time: request.execution_time,
                value: request.value,
                created_at,
            });
        }
        requests.len() as u64
    }

    fn remove_records(&mut self, source_name: &str) -> u64 {
        self.records.remove(source_name).map_or(0, |records| records.len() as u64)
    }

    fn remove_summary(&mut self, source_name: &str) -> bool {
        let removed = self.summaries.remove(source_name).is_some();
        if removed {
            self.records.remove(source_name);
        }
        removed
    }
}

/// Repository holding everything in process memory behind a single lock.
///
/// Enforces the same rules as the PostgreSQL schema: one summary per source name, records
/// only under a source that has a summary, and cascade from summary to records.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn add_records(&self, records: &[ValueRecordCreateDBRequest]) -> Result<u64> {
        let mut state = self.state.write().await;

        if let Some(orphan) = records.iter().find(|r| !state.summaries.contains_key(&r.source_name)) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("value_records_source_name_fkey".to_string()),
                table: Some("value_records".to_string()),
                message: format!("no summary for source '{}'", orphan.source_name),
            });
        }

        Ok(state.insert_records(records))
    }

    async fn add_summary(&self, summary: &SummaryCreateDBRequest) -> Result<SummaryDBResponse> {
        self.state.write().await.insert_summary(summary)
    }

    async fn delete_records(&self, source_name: &str) -> Result<u64> {
        Ok(self.state.write().await.remove_records(source_name))
    }

    async fn delete_summary(&self, source_name: &str) -> Result<bool> {
        Ok(self.state.write().await.remove_summary(source_name))
    }

    async fn get_summary(&self, source_name: &str) -> Result<Option<SummaryDBResponse>> {
        Ok(self.state.read().await.summaries.get(source_name).cloned())
    }

    async fn list_summaries(&self, filter: &SummaryFilter) -> Result<Vec<SummaryDBResponse>> {
        let state = self.state.read().await;
        let mut summaries: Vec<Summary> = state.summaries.values().filter(|s| filter.matches(s)).cloned().collect();
        summaries.sort_by(|a, b| {
            a.first_operation_at
                .cmp(&b.first_operation_at)
                .then_with(|| a.source_name.cmp(&b.source_name))
        });
        Ok(summaries)
    }

    async fn recent_records(&self, source_name: &str, limit: i64) -> Result<Vec<ValueRecordDBResponse>> {
        let state = self.state.read().await;
        let Some(records) = state.records.get(source_name) else {
            return Ok(Vec::new());
        };

        let mut recent = records.clone();
        recent.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then_with(|| a.id.cmp(&b.id)));
        recent.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(recent)
    }

    async fn replace(
        &self,
        source_name: &str,
        records: &[ValueRecordCreateDBRequest],
        summary: &SummaryCreateDBRequest,
    ) -> Result<SummaryDBResponse> {
        let mut state = self.state.write().await;

        if let Some(stray) = records.iter().find(|r| r.source_name != summary.source_name) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("value_records_source_name_fkey".to_string()),
                table: Some("value_records".to_string()),
                message: format!("no summary for source '{}'", stray.source_name),
            });
        }

        if summary.source_name != source_name && state.summaries.contains_key(&summary.source_name) {
            return Err(DbError::UniqueViolation {
                constraint: Some("summaries_source_name_unique".to_string()),
                table: Some("summaries".to_string()),
                message: format!("summary for '{}' already exists", summary.source_name),
            });
        }

        // Nothing has been touched yet, so every early return above leaves the old data in place.
        state.remove_summary(source_name);
        state.remove_records(source_name);

        let created = state.insert_summary(summary)?;
        state.insert_records(records);
        Ok(created)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

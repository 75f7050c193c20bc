//! Ingestion orchestrator: read, validate, aggregate, replace.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
    db::{errors::DbError, handlers::Repository},
    ingest::{
        aggregate,
        parser::{RecordParser, ValidationError},
    },
};

/// Why an ingestion attempt failed
#[derive(Debug, Error)]
pub enum IngestError {
    /// The batch content is invalid. The message is shown to the uploader as-is.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Store(#[from] DbError),

    #[error("processing was cancelled")]
    Cancelled,

    #[error("validated batch produced no records")]
    EmptyBatch,
}

/// Result of one ingestion attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub message: String,
    pub source_name: String,
    pub rows_saved: u64,
}

impl IngestOutcome {
    fn saved(source_name: &str, rows_saved: u64) -> Self {
        Self {
            success: true,
            message: "File processed successfully".to_string(),
            source_name: source_name.to_string(),
            rows_saved,
        }
    }

    fn failed(source_name: &str, message: String) -> Self {
        Self {
            success: false,
            message,
            source_name: source_name.to_string(),
            rows_saved: 0,
        }
    }
}

/// Drives one upload from raw bytes to stored records and summary
#[derive(Clone)]
pub struct IngestService {
    repository: Arc<dyn Repository>,
    parser: RecordParser,
}

impl IngestService {
    pub fn new(repository: Arc<dyn Repository>, parser: RecordParser) -> Self {
        Self { repository, parser }
    }

    /// Ingest a batch, replacing whatever was stored under `source_name`.
    ///
    /// Never fails: every error is folded into a negative [`IngestOutcome`]. Data already
    /// stored for the source survives any failed attempt.
    #[instrument(skip(self, reader, cancel))]
    pub async fn ingest<R>(&self, source_name: &str, reader: R, cancel: &CancellationToken) -> IngestOutcome
    where
        R: AsyncRead + Unpin + Send,
    {
        match self.try_ingest(source_name, reader, cancel).await {
            Ok(rows) => {
                info!(rows, "File ingested");
                IngestOutcome::saved(source_name, rows)
            }
            Err(IngestError::Validation(e)) => {
                warn!(error = %e, "File rejected");
                IngestOutcome::failed(source_name, e.to_string())
            }
            Err(e) => {
                error!(error = %e, "File processing failed");
                IngestOutcome::failed(source_name, format!("Failed to process file: {e}"))
            }
        }
    }

    async fn try_ingest<R>(&self, source_name: &str, reader: R, cancel: &CancellationToken) -> Result<u64, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let lines = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            lines = read_data_lines(reader) => lines?,
        };

        let records = self.parser.parse_batch(&lines, source_name)?;
        let summary = aggregate::summarize(source_name, &records).ok_or(IngestError::EmptyBatch)?;

        // Dropping the replace future mid-flight rolls its transaction back
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            stored = self.repository.replace(source_name, &records, &summary) => {
                stored?;
            }
        }

        Ok(records.len() as u64)
    }
}

/// Read the whole input and return its non-blank lines after the header.
///
/// `\n`, `\r\n` and a bare `\r` all end a line.
async fn read_data_lines<R>(mut reader: R) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;

    let text = String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    Ok(text
        .split(['\r', '\n'])
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            handlers::MemoryRepository,
            models::summaries::SummaryFilter,
        },
        ingest::{clock::FixedClock, parser::ValidationRules},
    };
    use chrono::{TimeZone, Utc};
    use test_log::test;

    fn service(repository: Arc<MemoryRepository>) -> IngestService {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        IngestService::new(repository, RecordParser::new(ValidationRules::default(), Arc::new(clock)))
    }

    const GOOD: &str = "Date;ExecutionTime;Value\n\
        2024-03-01T10-00-00.0000Z;1.0;100\n\
        2024-03-01T10-00-30.0000Z;2.0;200\n\
        \n\
        2024-03-01T10-01-00.0000Z;3.0;150\n";

    #[test(tokio::test)]
    async fn test_ingest_stores_records_and_summary() {
        let repo = Arc::new(MemoryRepository::new());
        let outcome = service(repo.clone())
            .ingest("data.csv", GOOD.as_bytes(), &CancellationToken::new())
            .await;

        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.rows_saved, 3);
        assert_eq!(outcome.source_name, "data.csv");

        let summary = repo.get_summary("data.csv").await.unwrap().unwrap();
        assert_eq!(summary.median_value, 150.0);
        assert_eq!(summary.average_execution_time, 2.0);
        assert_eq!(summary.time_span_seconds, 60.0);
        assert_eq!(repo.recent_records("data.csv", 10).await.unwrap().len(), 3);
    }

    #[test(tokio::test)]
    async fn test_reingest_replaces_previous_batch() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service(repo.clone());
        let second = "header\n2024-04-01T00-00-00.0000Z;5;500\n";

        assert!(service.ingest("data.csv", GOOD.as_bytes(), &CancellationToken::new()).await.success);
        let outcome = service.ingest("data.csv", second.as_bytes(), &CancellationToken::new()).await;

        assert!(outcome.success);
        assert_eq!(outcome.rows_saved, 1);

        let summaries = repo.list_summaries(&SummaryFilter::new()).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].average_value, 500.0);

        let records = repo.recent_records("data.csv", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 500.0);
    }

    #[test(tokio::test)]
    async fn test_failed_reingest_keeps_previous_data() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service(repo.clone());
        let bad = "header\n2024-04-01T00-00-00.0000Z;-1;5\n";

        assert!(service.ingest("data.csv", GOOD.as_bytes(), &CancellationToken::new()).await.success);
        let outcome = service.ingest("data.csv", bad.as_bytes(), &CancellationToken::new()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.rows_saved, 0);
        assert_eq!(outcome.message, "Line 1: execution time (-1) cannot be negative");
        assert_eq!(repo.recent_records("data.csv", 10).await.unwrap().len(), 3);
        assert_eq!(repo.get_summary("data.csv").await.unwrap().unwrap().median_value, 150.0);
    }

    #[test(tokio::test)]
    async fn test_header_only_file_is_rejected() {
        let repo = Arc::new(MemoryRepository::new());
        let outcome = service(repo.clone())
            .ingest("empty.csv", "Date;ExecutionTime;Value\n".as_bytes(), &CancellationToken::new())
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Line count (0)"), "{}", outcome.message);
        assert!(repo.get_summary("empty.csv").await.unwrap().is_none());
    }

    #[test(tokio::test)]
    async fn test_crlf_and_bom_are_tolerated() {
        let repo = Arc::new(MemoryRepository::new());
        let input = "\u{feff}Date;ExecutionTime;Value\r\n2024-03-01T10-00-00.0000Z;1;2\r\n";

        let outcome = service(repo).ingest("win.csv", input.as_bytes(), &CancellationToken::new()).await;

        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.rows_saved, 1);
    }

    #[test(tokio::test)]
    async fn test_bare_carriage_returns_end_lines() {
        let repo = Arc::new(MemoryRepository::new());
        let input = "Date;ExecutionTime;Value\r2024-03-01T10-00-00.0000Z;1;2\r2024-03-01T10-00-05.0000Z;3;4\r";

        let outcome = service(repo.clone()).ingest("mac.csv", input.as_bytes(), &CancellationToken::new()).await;

        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.rows_saved, 2);
        assert_eq!(repo.get_summary("mac.csv").await.unwrap().unwrap().time_span_seconds, 5.0);
    }

    #[test(tokio::test)]
    async fn test_non_utf8_input_is_a_system_failure() {
        let repo = Arc::new(MemoryRepository::new());
        let input: &[u8] = b"header\n\xff\xfe;1;1\n";

        let outcome = service(repo).ingest("bin.csv", input, &CancellationToken::new()).await;

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Failed to process file: failed to read input"));
    }

    #[test(tokio::test)]
    async fn test_cancelled_ingest_writes_nothing() {
        let repo = Arc::new(MemoryRepository::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = service(repo.clone()).ingest("data.csv", GOOD.as_bytes(), &cancel).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to process file: processing was cancelled");
        assert!(repo.get_summary("data.csv").await.unwrap().is_none());
    }
}

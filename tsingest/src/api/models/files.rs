use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ingest::IngestOutcome;

/// Result of processing an uploaded file.
///
/// Returned with status 200 for both accepted and rejected content; check `success`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileUploadResponse {
    /// Whether the file was validated and stored
    pub success: bool,
    /// Confirmation, or the reason the file was rejected
    #[schema(example = "Line 3: execution time (-1) cannot be negative")]
    pub message: String,
    /// Name the records and summary are stored under
    #[schema(example = "measurements.csv")]
    pub source_name: String,
    /// Number of records stored (0 on failure)
    pub rows_saved: u64,
}

impl From<IngestOutcome> for FileUploadResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message,
            source_name: outcome.source_name,
            rows_saved: outcome.rows_saved,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{db::models::records::ValueRecordDBResponse, types::RecordId};

/// One stored observation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValueRecordResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RecordId,
    pub source_name: String,
    /// When the observation was taken (UTC)
    pub timestamp: DateTime<Utc>,
    pub execution_time: f64,
    pub value: f64,
}

impl From<ValueRecordDBResponse> for ValueRecordResponse {
    fn from(db: ValueRecordDBResponse) -> Self {
        Self {
            id: db.id,
            source_name: db.source_name,
            timestamp: db.recorded_at,
            execution_time: db.execution_time,
            value: db.value,
        }
    }
}

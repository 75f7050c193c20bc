//! Database models for value records.

use crate::types::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database request for inserting one validated observation.
///
/// Produced by the record parser; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecordCreateDBRequest {
    pub source_name: String,
    pub recorded_at: DateTime<Utc>,
    pub execution_time: f64,
    pub value: f64,
}

/// Database representation of a stored observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ValueRecord {
    pub id: RecordId,
    pub source_name: String,
    pub recorded_at: DateTime<Utc>,
    pub execution_time: f64,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

/// Response from database after reading value records
pub type ValueRecordDBResponse = ValueRecord;

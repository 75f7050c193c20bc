use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    db::models::summaries::{SummaryDBResponse, SummaryFilter},
    errors::Error,
    types::SummaryId,
};

/// Query parameters for listing summaries. Every parameter is optional.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSummariesQuery {
    /// Exact source name; blank is ignored
    pub source_name: Option<String>,
    /// Earliest first operation, inclusive. RFC 3339 timestamp or `YYYY-MM-DD` (midnight UTC).
    #[param(example = "2024-01-01")]
    pub first_operation_from: Option<String>,
    /// Latest first operation day, inclusive through the end of that day (UTC).
    /// `YYYY-MM-DD`, or an RFC 3339 timestamp whose UTC date is used.
    #[param(example = "2024-01-31")]
    pub first_operation_to: Option<String>,
    pub average_value_from: Option<f64>,
    pub average_value_to: Option<f64>,
    pub average_execution_time_from: Option<f64>,
    pub average_execution_time_to: Option<f64>,
}

fn parse_instant(name: &str, raw: &str) -> Result<DateTime<Utc>, Error> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| Error::BadRequest {
            message: format!("{name} must be an RFC 3339 timestamp or a YYYY-MM-DD date, got '{raw}'"),
        })
}

fn parse_day(name: &str, raw: &str) -> Result<NaiveDate, Error> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_instant(name, raw).map(|instant| instant.date_naive())
}

impl TryFrom<ListSummariesQuery> for SummaryFilter {
    type Error = Error;

    fn try_from(query: ListSummariesQuery) -> Result<Self, Self::Error> {
        let mut filter = SummaryFilter::new()
            .average_value_between(query.average_value_from, query.average_value_to)
            .average_execution_time_between(query.average_execution_time_from, query.average_execution_time_to);

        if let Some(name) = query.source_name {
            filter = filter.source_name(name);
        }
        if let Some(raw) = query.first_operation_from.as_deref() {
            filter = filter.first_operation_from(parse_instant("first_operation_from", raw)?);
        }
        if let Some(raw) = query.first_operation_to.as_deref() {
            filter = filter.first_operation_to(parse_day("first_operation_to", raw)?);
        }

        Ok(filter)
    }
}

/// Aggregate statistics for one uploaded file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SummaryId,
    pub source_name: String,
    /// Seconds between the earliest and latest timestamp
    pub time_span_seconds: f64,
    /// Earliest timestamp in the file
    pub first_operation_at: DateTime<Utc>,
    pub average_execution_time: f64,
    pub average_value: f64,
    pub median_value: f64,
    pub max_value: f64,
    pub min_value: f64,
}

impl From<SummaryDBResponse> for SummaryResponse {
    fn from(db: SummaryDBResponse) -> Self {
        Self {
            id: db.id,
            source_name: db.source_name,
            time_span_seconds: db.time_span_seconds,
            first_operation_at: db.first_operation_at,
            average_execution_time: db.average_execution_time,
            average_value: db.average_value,
            median_value: db.median_value,
            max_value: db.max_value,
            min_value: db.min_value,
        }
    }
}

//! Database models for per-source summaries.

use crate::types::SummaryId;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Database request for inserting a freshly computed summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCreateDBRequest {
    pub source_name: String,
    pub time_span_seconds: f64,
    pub first_operation_at: DateTime<Utc>,
    pub average_execution_time: f64,
    pub average_value: f64,
    pub median_value: f64,
    pub max_value: f64,
    pub min_value: f64,
}

/// Database representation of a summary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Summary {
    pub id: SummaryId,
    pub source_name: String,
    pub time_span_seconds: f64,
    pub first_operation_at: DateTime<Utc>,
    pub average_execution_time: f64,
    pub average_value: f64,
    pub median_value: f64,
    pub max_value: f64,
    pub min_value: f64,
    pub created_at: DateTime<Utc>,
}

/// Response from database after creating or reading a summary
pub type SummaryDBResponse = Summary;

/// Filter for listing summaries. Every field is optional; `None` leaves that
/// dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub source_name: Option<String>,
    pub first_operation_from: Option<DateTime<Utc>>,
    /// Inclusive through the end of this calendar day (UTC)
    pub first_operation_to: Option<NaiveDate>,
    pub average_value_from: Option<f64>,
    pub average_value_to: Option<f64>,
    pub average_execution_time_from: Option<f64>,
    pub average_execution_time_to: Option<f64>,
}

impl SummaryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn first_operation_from(mut self, from: DateTime<Utc>) -> Self {
        self.first_operation_from = Some(from);
        self
    }

    pub fn first_operation_to(mut self, to: NaiveDate) -> Self {
        self.first_operation_to = Some(to);
        self
    }

    pub fn average_value_between(mut self, from: Option<f64>, to: Option<f64>) -> Self {
        self.average_value_from = from;
        self.average_value_to = to;
        self
    }

    pub fn average_execution_time_between(mut self, from: Option<f64>, to: Option<f64>) -> Self {
        self.average_execution_time_from = from;
        self.average_execution_time_to = to;
        self
    }

    /// Source name to match, ignoring blank values
    pub fn effective_source_name(&self) -> Option<&str> {
        self.source_name.as_deref().filter(|name| !name.trim().is_empty())
    }

    /// Exclusive upper bound for `first_operation_at`: midnight after `first_operation_to`
    pub fn first_operation_before(&self) -> Option<DateTime<Utc>> {
        self.first_operation_to
            .and_then(|date| date.checked_add_days(Days::new(1)))
            .and_then(|next_day| next_day.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc())
    }

    /// Check a summary against the filter
    ///
    /// Mirrors the SQL predicate used by the PostgreSQL repository so that every
    /// store applies identical semantics.
    pub fn matches(&self, summary: &Summary) -> bool {
        if let Some(name) = self.effective_source_name()
            && summary.source_name != name
        {
            return false;
        }
        if let Some(from) = self.first_operation_from
            && summary.first_operation_at < from
        {
            return false;
        }
        if let Some(before) = self.first_operation_before()
            && summary.first_operation_at >= before
        {
            return false;
        }
        within(summary.average_value, self.average_value_from, self.average_value_to)
            && within(
                summary.average_execution_time,
                self.average_execution_time_from,
                self.average_execution_time_to,
            )
    }
}

fn within(value: f64, from: Option<f64>, to: Option<f64>) -> bool {
    from.is_none_or(|from| value >= from) && to.is_none_or(|to| value <= to)
}

//! Summary statistics over a validated batch.

use crate::db::models::{records::ValueRecordCreateDBRequest, summaries::SummaryCreateDBRequest};

/// Compute the summary row for a batch. Returns `None` for an empty batch.
pub fn summarize(source_name: &str, records: &[ValueRecordCreateDBRequest]) -> Option<SummaryCreateDBRequest> {
    let first = records.iter().map(|r| r.recorded_at).min()?;
    let last = records.iter().map(|r| r.recorded_at).max()?;
    let span = last - first;

    let count = records.len() as f64;
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();

    Some(SummaryCreateDBRequest {
        source_name: source_name.to_string(),
        time_span_seconds: span.num_seconds() as f64 + f64::from(span.subsec_nanos()) / 1e9,
        first_operation_at: first,
        average_execution_time: records.iter().map(|r| r.execution_time).sum::<f64>() / count,
        average_value: values.iter().sum::<f64>() / count,
        median_value: median(&values),
        max_value: values.iter().copied().fold(f64::MIN, f64::max),
        min_value: values.iter().copied().fold(f64::MAX, f64::min),
    })
}

/// Median of a set of values; the mean of the two middle values for even counts, 0 when empty
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

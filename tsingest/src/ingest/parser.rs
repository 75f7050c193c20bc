//! Line-level parsing and validation of uploaded batches.
//!
//! A batch is the list of data lines of one upload (header already removed). Every line
//! must look like:
//!
//! ```text
//! 2024-03-01T10-15-30.1234Z;1.250;42.7
//! ```
//!
//! Validation is all-or-nothing: the first bad line rejects the whole batch.

use std::{fmt, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::{
    config::IngestConfig,
    db::models::records::ValueRecordCreateDBRequest,
    ingest::clock::{Clock, SystemClock},
};

const FIELDS_PER_LINE: usize = 3;
const TIMESTAMP_LEN: usize = 25;

/// Bounds applied to every batch
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRules {
    pub min_lines: usize,
    pub max_lines: usize,
    pub delimiter: char,
    /// Earliest accepted timestamp (inclusive)
    pub earliest_timestamp: DateTime<Utc>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for ValidationRules {
    fn from(config: &IngestConfig) -> Self {
        Self {
            min_lines: config.min_lines,
            max_lines: config.max_lines,
            delimiter: config.delimiter,
            earliest_timestamp: config.earliest_timestamp,
        }
    }
}

/// Numeric column of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    ExecutionTime,
    Value,
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericField::ExecutionTime => write!(f, "execution time"),
            NumericField::Value => write!(f, "value"),
        }
    }
}

/// Reason a batch was rejected. Line numbers are 1-based over the data lines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Line count ({count}) must be between {min} and {max}")]
    LineCount { count: usize, min: usize, max: usize },

    #[error("Line {line}: invalid format, expected {expected} fields, found {found}")]
    ColumnCount { line: usize, expected: usize, found: usize },

    #[error("Line {line}: invalid timestamp '{raw}', expected yyyy-MM-ddTHH-mm-ss.ffffZ")]
    TimestampFormat { line: usize, raw: String },

    #[error("Line {line}: timestamp {timestamp} is later than the current time")]
    TimestampTooLate { line: usize, timestamp: DateTime<Utc> },

    #[error("Line {line}: timestamp {timestamp} is earlier than {earliest}")]
    TimestampTooEarly {
        line: usize,
        timestamp: DateTime<Utc>,
        earliest: DateTime<Utc>,
    },

    #[error("Line {line}: invalid {field} '{raw}'")]
    NumberFormat { line: usize, field: NumericField, raw: String },

    #[error("Line {line}: {field} ({raw}) cannot be negative")]
    Negative { line: usize, field: NumericField, raw: String },
}

/// Turns raw data lines into validated records for one source name
#[derive(Clone)]
pub struct RecordParser {
    rules: ValidationRules,
    clock: Arc<dyn Clock>,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(ValidationRules::default(), Arc::new(SystemClock))
    }
}

impl RecordParser {
    pub fn new(rules: ValidationRules, clock: Arc<dyn Clock>) -> Self {
        Self { rules, clock }
    }

    /// Validate a whole batch, failing on the first bad line
    pub fn parse_batch<S: AsRef<str>>(
        &self,
        lines: &[S],
        source_name: &str,
    ) -> Result<Vec<ValueRecordCreateDBRequest>, ValidationError> {
        if lines.len() < self.rules.min_lines || lines.len() > self.rules.max_lines {
            return Err(ValidationError::LineCount {
                count: lines.len(),
                min: self.rules.min_lines,
                max: self.rules.max_lines,
            });
        }

        // One reading of the clock per batch
        let now = self.clock.now();

        lines
            .iter()
            .enumerate()
            .map(|(index, line)| self.parse_line(line.as_ref(), index + 1, source_name, now))
            .collect()
    }

    fn parse_line(
        &self,
        line: &str,
        line_number: usize,
        source_name: &str,
        now: DateTime<Utc>,
    ) -> Result<ValueRecordCreateDBRequest, ValidationError> {
        let fields: Vec<&str> = line.split(self.rules.delimiter).collect();
        if fields.len() != FIELDS_PER_LINE {
            return Err(ValidationError::ColumnCount {
                line: line_number,
                expected: FIELDS_PER_LINE,
                found: fields.len(),
            });
        }

        let recorded_at = parse_timestamp(fields[0]).ok_or_else(|| ValidationError::TimestampFormat {
            line: line_number,
            raw: fields[0].to_string(),
        })?;
        if recorded_at > now {
            return Err(ValidationError::TimestampTooLate {
                line: line_number,
                timestamp: recorded_at,
            });
        }
        if recorded_at < self.rules.earliest_timestamp {
            return Err(ValidationError::TimestampTooEarly {
                line: line_number,
                timestamp: recorded_at,
                earliest: self.rules.earliest_timestamp,
            });
        }

        let execution_time = parse_non_negative(fields[1], line_number, NumericField::ExecutionTime)?;
        let value = parse_non_negative(fields[2], line_number, NumericField::Value)?;

        Ok(ValueRecordCreateDBRequest {
            source_name: source_name.to_string(),
            recorded_at,
            execution_time,
            value,
        })
    }
}

/// Parse `yyyy-MM-ddTHH-mm-ss.ffffZ` as UTC.
///
/// Exactly four fractional digits; every separator is literal.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let bytes = raw.as_bytes();
    if bytes.len() != TIMESTAMP_LEN {
        return None;
    }

    for (index, byte) in bytes.iter().enumerate() {
        let ok = match index {
            4 | 7 | 13 | 16 => *byte == b'-',
            10 => *byte == b'T',
            19 => *byte == b'.',
            24 => *byte == b'Z',
            _ => byte.is_ascii_digit(),
        };
        if !ok {
            return None;
        }
    }

    // All remaining positions are ASCII digits, so these slices are on char boundaries
    let number = |range: std::ops::Range<usize>| raw[range].parse::<u32>().ok();

    let year = i32::try_from(number(0..4)?).ok()?;
    let ten_thousandths = number(20..24)?;

    NaiveDate::from_ymd_opt(year, number(5..7)?, number(8..10)?)?
        .and_hms_nano_opt(number(11..13)?, number(14..16)?, number(17..19)?, ten_thousandths * 100_000)
        .map(|naive| naive.and_utc())
}

fn parse_non_negative(raw: &str, line: usize, field: NumericField) -> Result<f64, ValidationError> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NumberFormat {
            line,
            field,
            raw: raw.to_string(),
        })?;

    if parsed < 0.0 {
        return Err(ValidationError::Negative {
            line,
            field,
            raw: raw.to_string(),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::clock::FixedClock;
    use chrono::{TimeZone, Timelike};

    fn parser() -> RecordParser {
        RecordParser::new(
            ValidationRules::default(),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())),
        )
    }

    fn valid_lines(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("2024-01-01T10-{:02}-{:02}.0000Z;1.5;{}", (i / 60) % 60, i % 60, i))
            .collect()
    }

    #[test]
    fn test_parses_valid_line() {
        let records = parser().parse_batch(&["2024-03-01T10-15-30.1234Z;1.250;42.7"], "data.csv").unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_name, "data.csv");
        assert_eq!(
            record.recorded_at.with_nanosecond(0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap()
        );
        assert_eq!(record.recorded_at.nanosecond(), 123_400_000);
        assert_eq!(record.execution_time, 1.25);
        assert_eq!(record.value, 42.7);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let err = parser().parse_batch::<&str>(&[], "data.csv").unwrap_err();
        assert_eq!(err, ValidationError::LineCount { count: 0, min: 1, max: 10_000 });
    }

    #[test]
    fn test_line_count_bounds() {
        assert_eq!(parser().parse_batch(&valid_lines(1), "a.csv").unwrap().len(), 1);
        assert_eq!(parser().parse_batch(&valid_lines(10_000), "a.csv").unwrap().len(), 10_000);

        let err = parser().parse_batch(&valid_lines(10_001), "a.csv").unwrap_err();
        assert!(matches!(err, ValidationError::LineCount { count: 10_001, .. }));
    }

    #[test]
    fn test_column_count() {
        let err = parser().parse_batch(&["2024-01-01T10-00-00.0000Z;1"], "a.csv").unwrap_err();
        assert_eq!(err, ValidationError::ColumnCount { line: 1, expected: 3, found: 2 });

        let err = parser()
            .parse_batch(&["2024-01-01T10-00-00.0000Z;1;2", "2024-01-01T10-00-00.0000Z;1;2;3"], "a.csv")
            .unwrap_err();
        assert_eq!(err, ValidationError::ColumnCount { line: 2, expected: 3, found: 4 });
    }

    #[test]
    fn test_negative_execution_time_is_rejected() {
        let err = parser().parse_batch(&["2024-01-01T10-00-00.0000Z;-1;5"], "a.csv").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Negative { line: 1, field: NumericField::ExecutionTime, .. }
        ));
    }

    #[test]
    fn test_negative_value_is_rejected() {
        let err = parser().parse_batch(&["2024-01-01T10-00-00.0000Z;1;-0.5"], "a.csv").unwrap_err();
        assert!(matches!(err, ValidationError::Negative { field: NumericField::Value, .. }));
        assert_eq!(err.to_string(), "Line 1: value (-0.5) cannot be negative");
    }

    #[test]
    fn test_epoch_floor() {
        let err = parser().parse_batch(&["1999-12-31T23-59-59.9999Z;1;1"], "a.csv").unwrap_err();
        assert!(matches!(err, ValidationError::TimestampTooEarly { line: 1, .. }));

        let records = parser().parse_batch(&["2000-01-01T00-00-00.0000Z;1;1"], "a.csv").unwrap();
        assert_eq!(records[0].recorded_at, Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_future_timestamp_is_rejected() {
        let err = parser().parse_batch(&["2025-06-01T12-00-00.0001Z;1;1"], "a.csv").unwrap_err();
        assert!(matches!(err, ValidationError::TimestampTooLate { line: 1, .. }));

        // Exactly "now" is accepted
        assert!(parser().parse_batch(&["2025-06-01T12-00-00.0000Z;1;1"], "a.csv").is_ok());
    }

    #[test]
    fn test_malformed_timestamps() {
        for raw in [
            "2024-01-01 10-00-00.0000Z",
            "2024-01-01T10:00:00.0000Z",
            "2024-01-01T10-00-00.000Z",
            "2024-01-01T10-00-00.00000Z",
            "2024-01-01T10-00-00.0000",
            "2024-13-01T10-00-00.0000Z",
            "2024-02-30T10-00-00.0000Z",
            "2024-01-01T24-00-00.0000Z",
            "2024-01-01T10-00-00.00a0Z",
            " 2024-01-01T10-00-00.0000Z",
            "",
        ] {
            let line = format!("{raw};1;1");
            let err = parser().parse_batch(&[line], "a.csv").unwrap_err();
            assert!(
                matches!(err, ValidationError::TimestampFormat { line: 1, .. }),
                "expected format error for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_numbers() {
        for raw in ["abc", "1,5", "1,500", "", "NaN", "inf", "Infinity", "1.2.3"] {
            let line = format!("2024-01-01T10-00-00.0000Z;{raw};1");
            let err = parser().parse_batch(&[line], "a.csv").unwrap_err();
            assert!(
                matches!(err, ValidationError::NumberFormat { field: NumericField::ExecutionTime, .. }),
                "expected number format error for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_numbers_tolerate_surrounding_whitespace() {
        let records = parser().parse_batch(&["2024-01-01T10-00-00.0000Z; 2.5 ;1e2"], "a.csv").unwrap();
        assert_eq!(records[0].execution_time, 2.5);
        assert_eq!(records[0].value, 100.0);
    }

    #[test]
    fn test_first_bad_line_wins() {
        let lines = [
            "2024-01-01T10-00-00.0000Z;1;1",
            "2024-01-01T10-00-00.0000Z;x;1",
            "1999-01-01T10-00-00.0000Z;1;1",
        ];
        let err = parser().parse_batch(&lines, "a.csv").unwrap_err();
        assert!(matches!(err, ValidationError::NumberFormat { line: 2, .. }));
    }

    #[test]
    fn test_custom_rules() {
        let rules = ValidationRules {
            min_lines: 2,
            max_lines: 3,
            delimiter: ',',
            earliest_timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        };
        let parser = RecordParser::new(rules, Arc::new(FixedClock(Utc::now())));

        let err = parser.parse_batch(&["2024-01-01T10-00-00.0000Z,1,1"], "a.csv").unwrap_err();
        assert!(matches!(err, ValidationError::LineCount { count: 1, min: 2, max: 3 }));

        let records = parser
            .parse_batch(&["2024-01-01T10-00-00.0000Z,1,1", "2024-01-02T10-00-00.0000Z,2,2"], "a.csv")
            .unwrap();
        assert_eq!(records.len(), 2);

        let err = parser
            .parse_batch(&["2019-12-31T10-00-00.0000Z,1,1", "2024-01-02T10-00-00.0000Z,2,2"], "a.csv")
            .unwrap_err();
        assert!(matches!(err, ValidationError::TimestampTooEarly { line: 1, .. }));
    }
}

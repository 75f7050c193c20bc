//! Identifier aliases shared across the crate.

use uuid::Uuid;

/// Identifier of a stored value record
pub type RecordId = Uuid;

/// Identifier of a stored summary
pub type SummaryId = Uuid;

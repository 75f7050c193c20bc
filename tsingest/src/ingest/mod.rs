//! The ingestion pipeline and its read side.
//!
//! ```text
//! bytes ─→ header skipped, blank lines dropped
//!       ─→ [`parser::RecordParser`] (all-or-nothing validation)
//!       ─→ [`aggregate::summarize`]
//!       ─→ [`Repository::replace`](crate::db::handlers::Repository::replace)
//!       ─→ [`service::IngestOutcome`]
//! ```
//!
//! [`query::QueryService`] serves filtered summaries and the most recent records of a source.

pub mod aggregate;
pub mod clock;
pub mod parser;
pub mod query;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use parser::{RecordParser, ValidationError, ValidationRules};
pub use query::QueryService;
pub use service::{IngestError, IngestOutcome, IngestService};

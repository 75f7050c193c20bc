//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion data.
//!
//! - [`records`]: Individual observations parsed from uploaded files (`value_records`)
//! - [`summaries`]: Per-source aggregate statistics (`summaries`) and the summary filter
//!
//! Database models are distinct from the API models in [`crate::api::models`], which drop
//! technical fields such as `created_at`.

pub mod records;
pub mod summaries;

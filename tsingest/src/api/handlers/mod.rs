//! HTTP request handlers for all API endpoints.
//!
//! Handlers parse and validate the request, call into the ingestion or query service held in
//! [`crate::AppState`], and map the result onto a response model. Errors are returned as
//! [`crate::errors::Error`], which converts into the matching HTTP status.
//!
//! - [`files`]: file upload and ingestion
//! - [`summaries`]: filtered summary listing
//! - [`records`]: most recent records of a file
//! - [`health`]: liveness including storage

pub mod files;
pub mod health;
pub mod records;
pub mod summaries;

//! API request and response data models.
//!
//! API models are distinct from database models so the wire format can evolve
//! independently of storage. All models are annotated with `utoipa` for the OpenAPI docs.
//!
//! - [`files`]: upload outcome
//! - [`summaries`]: summary query parameters and responses
//! - [`records`]: stored observation responses

pub mod files;
pub mod records;
pub mod summaries;

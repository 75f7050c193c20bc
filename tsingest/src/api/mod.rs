//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! All routes live under `/api/v1`:
//!
//! - `POST /files` - upload and ingest a file
//! - `GET /summaries` - list summaries with optional filters
//! - `GET /records/{source_name}/recent` - newest records of a file
//! - `GET /healthz` - health check
//!
//! Endpoints are documented with `utoipa`; the rendered docs are served at `/docs`.

pub mod handlers;
pub mod models;

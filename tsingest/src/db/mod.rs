//! Database layer for data persistence and access.
//!
//! ```text
//! ┌──────────────────┐
//! │ Ingest / Queries │  (crate::ingest services)
//! └────────┬─────────┘
//!          │  Arc<dyn Repository>
//!          ↓
//! ┌──────────────────┐
//! │   Repositories   │  (db::handlers - Postgres or in-memory)
//! └────────┬─────────┘
//!          │
//!          ↓
//! ┌──────────────────┐
//! │      Models      │  (db::models - rows and create requests)
//! └────────┬─────────┘
//!          │
//!          ↓
//! ┌──────────────────┐
//! │    PostgreSQL    │
//! └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: table repositories and the [`handlers::Repository`] trait
//! - [`models`]: database record structures matching table schemas
//! - [`errors`]: database-specific error types
//!
//! # Migrations
//!
//! Migrations live in the `migrations/` directory and are applied on startup through
//! [`crate::migrator`]:
//!
//! ```ignore
//! tsingest::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;

//! Repository implementations for database access.
//!
//! Two layers live here:
//!
//! - Connection-scoped table repositories ([`Records`], [`Summaries`]) that wrap a SQLx
//!   connection or transaction and own the SQL for one table each.
//! - The [`Repository`] trait that the ingestion and query services depend on, with a
//!   PostgreSQL implementation ([`PostgresRepository`]) built from the table repositories and
//!   an in-memory one ([`MemoryRepository`]).
//!
//! # Usage
//!
//! ```ignore
//! use tsingest::db::handlers::{Records, Summaries};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!
//!     Summaries::new(&mut tx).delete_by_source("data.csv").await?;
//!     let recent = Records::new(&mut tx).list_recent_by_source("data.csv", 10).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod postgres;
pub mod records;
pub mod repository;
pub mod summaries;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use records::Records;
pub use repository::Repository;
pub use summaries::Summaries;

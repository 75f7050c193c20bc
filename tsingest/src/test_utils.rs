//! Test utilities for integration testing (available with `test-utils` feature).

use crate::config::{Config, DatabaseConfig};
use crate::db::handlers::{MemoryRepository, Repository};
use axum_test::TestServer;
use std::sync::Arc;

/// Configuration for tests: in-memory storage, loopback host, defaults elsewhere
pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        ..Default::default()
    }
}

/// Build a test server backed by a fresh in-memory repository
pub async fn create_test_app(config: Config) -> TestServer {
    let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    create_test_app_with_repository(config, repository)
}

/// Build a test server around a caller-supplied repository (e.g. a PostgreSQL one in `#[sqlx::test]`)
pub fn create_test_app_with_repository(config: Config, repository: Arc<dyn Repository>) -> TestServer {
    crate::Application::from_repository(config, repository)
        .expect("Failed to create application")
        .into_test_server()
}

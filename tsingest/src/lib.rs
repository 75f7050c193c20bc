//! # tsingest: ingestion service for delimited time-series files
//!
//! `tsingest` accepts uploaded files of timestamped measurements, validates every line, stores
//! the records, and keeps one row of summary statistics per file for later filtering.
//!
//! ## Overview
//!
//! A file is a header line followed by 1 to 10,000 lines of
//! `yyyy-MM-ddTHH-mm-ss.ffffZ;<execution time>;<value>`. The file's name identifies the batch:
//! uploading a file with a name that was seen before replaces everything stored under that
//! name. Validation is all-or-nothing, and a failed upload leaves earlier data untouched.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum). Storage is PostgreSQL
//! (through SQLx, with migrations applied on startup) or an in-process store for development.
//!
//! ### Core Components
//!
//! The **ingest layer** ([`ingest`]) holds the pipeline: the record parser and validator, the
//! aggregator that computes the summary, the orchestrator that ties them to storage, and the
//! query service for the read side.
//!
//! The **database layer** ([`db`]) defines the [`db::handlers::Repository`] trait that the
//! services depend on, plus its PostgreSQL and in-memory implementations.
//!
//! The **API layer** ([`api`]) exposes upload, summary listing, recent records and a health
//! check under `/api/v1`, documented with OpenAPI at `/docs`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use tsingest::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = tsingest::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     tsingest::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingest;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    config::{CorsOrigin, DatabaseConfig, PoolSettings},
    db::handlers::{MemoryRepository, PostgresRepository, Repository},
    ingest::{IngestService, QueryService, RecordParser, SystemClock, ValidationRules},
    openapi::ApiDoc,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
/// let state = AppState::builder()
///     .config(config)
///     .repository(repository.clone())
///     .ingest(IngestService::new(repository.clone(), RecordParser::default()))
///     .queries(QueryService::new(repository, 10))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    pub ingest: IngestService,
    pub queries: QueryService,
    /// Cancelled when the server begins shutting down; in-flight ingests derive child tokens
    #[builder(default)]
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the services for a repository using the ingest settings from `config`
    pub fn from_repository(config: Config, repository: Arc<dyn Repository>) -> Self {
        let parser = RecordParser::new(ValidationRules::from(&config.ingest), Arc::new(SystemClock));
        let recent_limit = config.ingest.recent_limit;

        AppState::builder()
            .ingest(IngestService::new(repository.clone(), parser))
            .queries(QueryService::new(repository.clone(), recent_limit))
            .repository(repository)
            .config(config)
            .build()
    }
}

/// Get the tsingest database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build a connection pool from pool settings
async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    // 0 means "never"
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    Ok(options.connect(url).await?)
}

/// Connect storage and run migrations.
/// Returns the repository and, for PostgreSQL, the pool so it can be closed on shutdown.
async fn setup_repository(config: &Config) -> anyhow::Result<(Arc<dyn Repository>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::External { url, pool: settings } => {
            info!("Using external database");
            let pool = connect_pool(url, settings).await?;
            migrator().run(&pool).await?;
            Ok((Arc::new(PostgresRepository::new(pool.clone())), Some(pool)))
        }
        DatabaseConfig::Memory => {
            info!("Using in-memory storage: data will be lost on shutdown");
            Ok((Arc::new(MemoryRepository::new()), None))
        }
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = &config.cors;

    let allow_origin = if cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if let Some(max_age) = cors.max_age {
        layer = layer.max_age(Duration::from_secs(max_age));
    }

    Ok(layer)
}

/// Build the application router with all endpoints and middleware.
///
/// - `/api/v1/*`: upload, summaries, recent records, health
/// - `/docs` and `/api-docs/openapi.json`: API documentation
/// - CORS and request tracing on every route
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = state.config.ingest.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let cors = create_cors_layer(&state.config)?;

    let api_routes = Router::new()
        .route(
            "/files",
            post(api::handlers::files::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/summaries", get(api::handlers::summaries::list_summaries))
        .route("/records/{source_name}/recent", get(api::handlers::records::recent_records))
        .route("/healthz", get(api::handlers::health::healthz));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// A fully wired server: router, shared state and the resources to release on shutdown.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
    shutdown_token: CancellationToken,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting tsingest with configuration: {:#?}", config);

        let (repository, pool) = setup_repository(&config).await?;
        let mut app = Self::from_repository(config, repository)?;
        app.pool = pool;

        Ok(app)
    }

    /// Build an application around an existing repository, skipping database setup
    pub fn from_repository(config: Config, repository: Arc<dyn Repository>) -> anyhow::Result<Self> {
        let state = AppState::from_repository(config.clone(), repository);
        let shutdown_token = state.shutdown.clone();
        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            pool: None,
            shutdown_token,
        })
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("tsingest listening on http://{}, docs at http://{}/docs", bind_addr, bind_addr);

        let shutdown_token = self.shutdown_token.clone();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown.await;
                // Abandon in-flight ingests; their writes roll back
                shutdown_token.cancel();
            })
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_docs_are_served() {
        let server = create_test_app(create_test_config()).await;

        let doc = server.get("/api-docs/openapi.json").await;
        doc.assert_status_ok();
        assert!(doc.text().contains("\"openapi\""));
        assert!(doc.text().contains("/records/{source_name}/recent"));

        server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = create_test_app(create_test_config()).await;

        server.get("/api/v1/nothing").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let mut config = create_test_config();
        config.cors = CorsConfig {
            allowed_origins: vec![CorsOrigin::Url("https://app.example.com".parse().unwrap())],
            max_age: None,
        };
        let server = create_test_app(config).await;

        let response = server
            .get("/api/v1/healthz")
            .add_header("origin", "https://app.example.com")
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://app.example.com"
        );
    }

    #[test]
    fn test_default_cors_layer_builds() {
        let config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());
    }
}

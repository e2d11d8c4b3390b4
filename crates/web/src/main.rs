//! Civic Pulse web server.
//!
//! Citizens report geotagged issues with an optional photo, browse and upvote
//! them; administrators triage them (status, assignee) from `/admin`.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - `PostgreSQL` (or in-memory stores seeded with demo data) behind the
//!   `UserStore` / `IssueStore` traits
//! - Uploaded photos on local disk, served from `/uploads`
//! - tower-sessions for the signed-in user and flash notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::Request;
use sentry::integrations::tracing as sentry_tracing;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use civic_pulse_web::config::{DataBackend, WebConfig};
use civic_pulse_web::db::{self, MemoryIssueStore, MemoryUserStore, seed};
use civic_pulse_web::middleware;
use civic_pulse_web::services::auth::hash_password;
use civic_pulse_web::services::storage::LocalObjectStorage;
use civic_pulse_web::state::AppState;

/// Password given to every demo account in memory mode.
const DEMO_PASSWORD: &str = "civicpulse-demo";

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &WebConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Text logs by default, flattened JSON lines when `json` is set.
fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "civic_pulse_web=info,tower_http=debug".into());

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Router over `PostgreSQL`.
async fn postgres_app(config: &WebConfig) -> Router {
    let database_url = config
        .database_url
        .as_ref()
        .expect("CIVIC_DATABASE_URL is required for the postgres backend");
    let pool = db::create_pool(database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // Migrations are NOT run on startup: `cargo run -p civic-pulse-cli -- migrate`
    let session_layer = middleware::create_session_layer(&pool, config);
    let state = AppState::new(config.clone(), pool);
    civic_pulse_web::app(state, session_layer, Some(middleware::auth_rate_limiter()))
}

/// Router over process-local stores seeded with the demo data.
async fn memory_app(config: &WebConfig) -> Router {
    let users = Arc::new(MemoryUserStore::new());
    let issues = Arc::new(MemoryIssueStore::new());
    let password_hash = hash_password(DEMO_PASSWORD).expect("Failed to hash demo password");
    let summary = seed::seed_demo_data(users.as_ref(), issues.as_ref(), &password_hash)
        .await
        .expect("Failed to seed demo data");
    tracing::info!(
        users = summary.users_created,
        issues = summary.issues_created,
        password = DEMO_PASSWORD,
        accounts = ?seed::demo_emails().collect::<Vec<_>>(),
        "Memory backend seeded with demo accounts"
    );

    let storage = Arc::new(LocalObjectStorage::new(config.upload_dir.clone()));
    let state = AppState::from_parts(config.clone(), users, issues, storage);
    let session_layer = middleware::create_memory_session_layer(config);
    civic_pulse_web::app(state, session_layer, Some(middleware::auth_rate_limiter()))
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = WebConfig::from_env().expect("Failed to load configuration");

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_json);
    tracing::debug!(?config, "Configuration loaded");

    let app = match config.backend {
        DataBackend::Postgres => postgres_app(&config).await,
        DataBackend::Memory => memory_app(&config).await,
    };

    let app = app
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!(backend = ?config.backend, "civic-pulse listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

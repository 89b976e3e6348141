//! Application startup and lifecycle management.

use crate::config::{MatcherConfig, MatchingConfig};
use crate::handlers;
use crate::services::{
    init_metrics, spawn_event_logger, Database, EventBus, Reconciler, ReconciliationStore,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Reconciler,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ReconciliationStore>,
        events: EventBus,
        matching: &MatchingConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store, events, matching),
        }
    }
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/reconciliation/match", post(handlers::run_match))
        .route(
            "/reconciliation/approvals",
            post(handlers::submit_for_approval),
        )
        .route(
            "/reconciliation/approvals/:approval_id",
            get(handlers::get_approval),
        )
        .route(
            "/reconciliation/approvals/:approval_id/decision",
            post(handlers::decide_approval),
        )
        .route(
            "/reconciliation/approvals/:approval_id/execute",
            post(handlers::execute_approval),
        )
        .route(
            "/workflow/instances/:instance_id/transitions",
            post(handlers::transition),
        )
        .layer(trace_layer)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    db: Arc<Database>,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: MatcherConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: MatcherConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: MatcherConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let db = Arc::new(db);

        let events = EventBus::default();
        spawn_event_logger(&events);

        let state = AppState::new(db.clone(), events, &config.matching);

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Reconciliation matcher listener bound");

        Ok(Self {
            port,
            listener,
            state,
            db,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "reconciliation-matcher",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

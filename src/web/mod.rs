//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::MonitorConfig;
use crate::probe::HttpProbe;
use crate::scheduler::Scheduler;
use crate::summary::{Analyzer, GeminiGenerator};

use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: MonitorConfig,
    pub scheduler: Arc<Scheduler<HttpProbe>>,
    pub analyzer: Arc<Analyzer<GeminiGenerator>>,
}

/// Web server exposing the live snapshot and session controls.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(
        config: MonitorConfig,
        scheduler: Arc<Scheduler<HttpProbe>>,
        analyzer: Arc<Analyzer<GeminiGenerator>>,
    ) -> Self {
        Self {
            state: AppState {
                config,
                scheduler,
                analyzer,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/api/snapshot", get(handlers::handle_snapshot))
            .route("/api/targets", get(handlers::handle_get_targets))
            .route("/api/target/{id}", put(handlers::handle_select_target))
            .route("/api/start", post(handlers::handle_start))
            .route("/api/stop", post(handlers::handle_stop))
            .route("/api/reset", post(handlers::handle_reset))
            .route("/api/summary", post(handlers::handle_summary))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

use anyhow::{Context, Result};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::{info, warn};

use crate::catalog_store::{CatalogStats, CatalogStore};
use crate::user::UserManager;
use tower_http::services::ServeDir;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::auth_routes::make_auth_routes;
use super::catalog_routes::make_catalog_routes;
use super::metrics::metrics_handler;
use super::session::Session;
use super::{log_requests, state::*, throttled, ServerConfig, SessionTokenKeyExtractor};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub started_at: String,
    pub hash: String,
    pub catalog: CatalogStats,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let catalog = state.catalog_store.stats().unwrap_or_else(|err| {
        warn!("Could not count catalog items: {}", err);
        CatalogStats::default()
    });
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        started_at: state.started_at.to_rfc3339(),
        hash: state.hash.clone(),
        catalog,
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    user_manager: GuardedUserManager,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), catalog_store, user_manager);

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let v1_routes: Router =
        make_catalog_routes(state.clone()).nest("/auth", make_auth_routes(state.clone())?);
    let v1_routes = throttled(
        v1_routes,
        SessionTokenKeyExtractor,
        config.requests_per_minute,
        "api",
    )?;

    let app: Router = home_router
        .nest("/v1", v1_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

pub async fn run_server(
    config: ServerConfig,
    catalog_store: Arc<dyn CatalogStore>,
    user_manager: UserManager,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, catalog_store, Arc::new(Mutex::new(user_manager)))?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Could not bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Could not bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let api = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());
    let metrics =
        axum::serve(metrics_listener, make_metrics_app()).with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = api => result.context("API server failed"),
        result = metrics => result.context("Metrics server failed"),
    }
}

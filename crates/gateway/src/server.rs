use std::net::SocketAddr;

use {
    agentdesk_bootstrap::Bootstrapper,
    agentdesk_config::AgentdeskConfig,
    anyhow::Context,
    axum::{Json, Router, extract::State, response::IntoResponse, routing::get},
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use crate::{state::AppState, system_routes::system_router};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/system", system_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until Ctrl-C.
pub async fn start_gateway(config: &AgentdeskConfig) -> anyhow::Result<()> {
    config.validate()?;

    let data_dir = agentdesk_config::data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

    let (bootstrapper, store) = Bootstrapper::connect(config)
        .await
        .context("failed to open the database")?;

    let report = bootstrapper.check().await;
    if report.initialized {
        info!(source = ?report.source, "system is initialized");
    } else {
        info!("system is not initialized; POST /api/system/init-admin to set it up");
    }

    let app = build_app(AppState::new(bootstrapper));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.bind, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    store.close().await;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}

use std::net::SocketAddr;

use {
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::get,
    },
    marketbot_config::BotConfig,
    tower_http::{services::ServeDir, trace::TraceLayer},
    tracing::{info, warn},
};

use crate::{
    error::{Context, Result},
    pages,
    state::AppState,
    webhook,
};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/webhook",
            get(webhook::verify_handler).post(webhook::event_handler),
        )
        .route("/web/Products", get(pages::products_handler))
        .route("/web/Store", get(pages::store_handler))
        .route("/web/ShoppingCart", get(pages::cart_handler))
        .route("/web/DeliverySetting", get(pages::delivery_handler))
        .route("/web/PaymentSetting", get(pages::payment_handler));

    if let Some(dir) = &state.config.web.static_dir {
        if dir.is_dir() {
            router = router.nest_service("/web", ServeDir::new(dir));
        } else {
            warn!(dir = %dir.display(), "static dir not found, /web assets disabled");
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Bind the configured address and serve until the process is stopped.
pub async fn start_server(config: BotConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let state = AppState::from_config(config)?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "webhook listening at http://{addr}/webhook");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}

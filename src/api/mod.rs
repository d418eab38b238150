//! Sibling HTTP surface for card recognition and lookup.
//!
//! Every endpoint except the health check is a stub: the recognition
//! pipeline and the card catalog integration are not built yet. This
//! service shares no logic with the harvest pipeline and may later become a
//! consumer of its listing data.

use axum::{
    extract::Path,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::Result;

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/scan", post(scan_card))
        .route("/api/cards/:id", get(get_card))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn serve(config: &ApiConfig) -> Result<()> {
    let app = create_router();
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("API listening on {}:{}", config.host, config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "floorwatch-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Upload a card image for recognition.
async fn scan_card() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "status": "not_implemented",
            "message": "recognition pipeline not built yet",
        })),
    )
}

/// Look up card details by catalog id.
async fn get_card(Path(card_id): Path<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "status": "not_implemented",
            "card_id": card_id,
        })),
    )
}

// src/handlers/whatsapp.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    config::AppState,
    models::whatsapp::{CommandOutcome, ConnectionStatus},
};

// GET /api/whatsapp-status
#[utoipa::path(
    get,
    path = "/api/whatsapp-status",
    tag = "WhatsApp",
    responses(
        (status = 200, description = "Status atual da conexão", body = ConnectionStatus)
    )
)]
pub async fn get_status(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.supervisor.status())
}

// POST /api/whatsapp-reconnect
#[utoipa::path(
    post,
    path = "/api/whatsapp-reconnect",
    tag = "WhatsApp",
    responses(
        (status = 200, description = "Pedido aceito, ou `success: false` se já houver tentativa em andamento", body = CommandOutcome)
    )
)]
pub async fn reconnect(State(app_state): State<AppState>) -> impl IntoResponse {
    tracing::info!("🔄 Reconexão solicitada pela API");
    (StatusCode::OK, Json(app_state.supervisor.request_reconnect()))
}

// POST /api/whatsapp-recreate
#[utoipa::path(
    post,
    path = "/api/whatsapp-recreate",
    tag = "WhatsApp",
    responses(
        (status = 200, description = "Pedido aceito, ou `success: false` se já houver tentativa em andamento", body = CommandOutcome)
    )
)]
pub async fn recreate(State(app_state): State<AppState>) -> impl IntoResponse {
    tracing::info!("♻️ Recriação do cliente solicitada pela API");
    (StatusCode::OK, Json(app_state.supervisor.request_recreate()))
}

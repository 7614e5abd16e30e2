// src/handlers/webhook.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{common::error::AppError, config::AppState, models::whatsapp::ClientEvent};

// POST /webhook/whatsapp
// Eventos enviados pelo gateway: {"event": "...", "data": {...}}
pub async fn receive_event(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    event: Result<Json<ClientEvent>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(expected) = &app_state.settings.gateway_api_key {
        let provided = headers.get("apikey").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            tracing::warn!("🚫 Webhook recusado: apikey inválida");
            return Err(AppError::InvalidWebhookToken);
        }
    }

    let Json(event) = event?;
    if !app_state.webhook_hub.publish(event) {
        tracing::debug!("Webhook recebido sem instância do cliente ouvindo");
    }
    Ok(StatusCode::ACCEPTED)
}

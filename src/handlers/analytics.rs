// src/handlers/analytics.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::{metrics::LeadMetrics, product::ProductStats},
};

// GET /api/metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "Analytics",
    responses(
        (status = 200, description = "Leads por dia, por hora (UTC) e horário de pico", body = LeadMetrics)
    )
)]
pub async fn get_metrics(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let metrics = app_state.lead_service.metrics().await?;
    Ok((StatusCode::OK, Json(metrics)))
}

// GET /api/products/stats
#[utoipa::path(
    get,
    path = "/api/products/stats",
    tag = "Analytics",
    responses(
        (status = 200, description = "Menções por produto, da mais citada para a menos citada. Lista vazia em caso de erro", body = Vec<ProductStats>)
    )
)]
pub async fn get_product_stats(State(app_state): State<AppState>) -> impl IntoResponse {
    let stats = match app_state.lead_service.product_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("❌ Erro ao calcular estatísticas de produtos: {}", e);
            Vec::new()
        }
    };
    (StatusCode::OK, Json(stats))
}

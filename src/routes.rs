// src/routes.rs

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas da API (JSON)
    let api_routes = Router::new()
        .route("/whatsapp-status", get(handlers::whatsapp::get_status))
        .route("/whatsapp-reconnect", post(handlers::whatsapp::reconnect))
        .route("/whatsapp-recreate", post(handlers::whatsapp::recreate))
        .route("/leads", get(handlers::leads::list_leads))
        .route(
            "/leads/{number}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        .route("/leads/{number}/update-tags", post(handlers::leads::update_tags))
        .route("/leads/{number}/form-data/{field}", put(handlers::leads::update_form_field))
        .route("/metrics", get(handlers::analytics::get_metrics))
        .route("/products/stats", get(handlers::analytics::get_product_stats));

    // Páginas
    let page_routes = Router::new()
        .route("/", get(handlers::pages::index))
        .route("/login", get(handlers::pages::login))
        .route("/products", get(handlers::pages::products))
        .route("/campaigns", get(handlers::pages::campaigns))
        .route("/settings", get(handlers::pages::settings))
        .route("/analytics", get(handlers::pages::analytics));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/webhook/whatsapp", post(handlers::webhook::receive_event))
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .with_state(app_state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Rota não encontrada" })))
}

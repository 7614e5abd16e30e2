// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- WhatsApp ---
        handlers::whatsapp::get_status,
        handlers::whatsapp::reconnect,
        handlers::whatsapp::recreate,

        // --- Leads ---
        handlers::leads::list_leads,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::leads::update_tags,
        handlers::leads::update_form_field,

        // --- Analytics ---
        handlers::analytics::get_metrics,
        handlers::analytics::get_product_stats,
    ),
    components(
        schemas(
            // --- WhatsApp ---
            models::whatsapp::ConnectionState,
            models::whatsapp::ConnectionStatus,
            models::whatsapp::CommandOutcome,

            // --- Leads ---
            models::lead::FormStatus,
            models::lead::FormData,
            models::lead::Lead,
            models::lead::TagUpdateResponse,

            // --- Payloads ---
            models::lead::UpdateLeadPayload,
            models::lead::FormDataPatch,
            models::lead::FormFieldPayload,

            // --- Analytics ---
            models::metrics::LeadMetrics,
            models::product::Product,
            models::product::MentionStats,
            models::product::ProductStats,
        )
    ),
    tags(
        (name = "WhatsApp", description = "Status e controle da conexão"),
        (name = "Leads", description = "Leads capturados pelas mensagens recebidas"),
        (name = "Analytics", description = "Métricas de leads e menções de produtos")
    )
)]
pub struct ApiDoc;

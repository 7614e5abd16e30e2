// src/handlers/leads.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::lead::{FormFieldPayload, Lead, TagUpdateResponse, UpdateLeadPayload},
    services::lead_service::DeleteOutcome,
};

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    responses(
        (status = 200, description = "Todos os leads, indexados pelo número", body = std::collections::BTreeMap<String, Lead>),
        (status = 500, description = "Erro ao ler o arquivo de leads")
    )
)]
pub async fn list_leads(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.lead_service.list().await?;
    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/leads/{number}
#[utoipa::path(
    get,
    path = "/api/leads/{number}",
    tag = "Leads",
    params(
        ("number" = String, Path, description = "Número do lead (com ou sem @c.us)")
    ),
    responses(
        (status = 200, description = "Lead encontrado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get(&number).await?;
    Ok((StatusCode::OK, Json(lead)))
}

// PUT /api/leads/{number}
#[utoipa::path(
    put,
    path = "/api/leads/{number}",
    tag = "Leads",
    params(
        ("number" = String, Path, description = "Número do lead")
    ),
    request_body = UpdateLeadPayload,
    responses(
        (status = 200, description = "Lead atualizado", body = Lead),
        (status = 400, description = "Payload inválido ou JSON malformado"),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    Path(number): Path<String>,
    payload: Result<Json<UpdateLeadPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let lead = app_state.lead_service.update(&number, payload).await?;
    tracing::info!("✏️ Lead {} atualizado", number);
    Ok((StatusCode::OK, Json(lead)))
}

// DELETE /api/leads/{number}
#[utoipa::path(
    delete,
    path = "/api/leads/{number}",
    tag = "Leads",
    params(
        ("number" = String, Path, description = "Número do lead")
    ),
    responses(
        (status = 204, description = "Lead removido"),
        (status = 404, description = "Lead não encontrado; lista os números existentes")
    )
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Response, AppError> {
    match app_state.lead_service.delete(&number).await? {
        DeleteOutcome::Deleted => {
            tracing::info!("🗑️ Lead {} removido", number);
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        DeleteOutcome::NotFound { available_numbers } => {
            tracing::warn!("❌ Lead {} não encontrado para exclusão", number);
            let body = json!({
                "error": "Lead não encontrado",
                "searchedNumber": number,
                "availableNumbers": available_numbers,
            });
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
    }
}

// POST /api/leads/{number}/update-tags
#[utoipa::path(
    post,
    path = "/api/leads/{number}/update-tags",
    tag = "Leads",
    params(
        ("number" = String, Path, description = "Número do lead")
    ),
    responses(
        (status = 200, description = "Tags resolvidas e unidas às existentes", body = TagUpdateResponse),
        (status = 404, description = "Lead ou contato não encontrado"),
        (status = 503, description = "Cliente WhatsApp não está pronto")
    )
)]
pub async fn update_tags(
    State(app_state): State<AppState>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("🔄 Atualização manual de tags para {}", number);

    // Falha cedo, sem tocar no WhatsApp, se o lead não existe
    app_state.lead_service.get(&number).await?;

    let resolved = app_state.tag_service.fetch_contact_tags(&number).await?;
    let tags = app_state.lead_service.merge_tags(&number, &resolved).await?;

    Ok((
        StatusCode::OK,
        Json(TagUpdateResponse {
            success: true,
            tags,
            message: "Tags atualizadas com sucesso".to_string(),
        }),
    ))
}

// PUT /api/leads/{number}/form-data/{field}
#[utoipa::path(
    put,
    path = "/api/leads/{number}/form-data/{field}",
    tag = "Leads",
    params(
        ("number" = String, Path, description = "Número do lead"),
        ("field" = String, Path, description = "nome, cpf, email, telefone, endereco ou cep")
    ),
    request_body = FormFieldPayload,
    responses(
        (status = 200, description = "Campo gravado e status do formulário recalculado", body = Lead),
        (status = 400, description = "Campo desconhecido ou valor inválido"),
        (status = 404, description = "Lead não encontrado")
    )
)]
pub async fn update_form_field(
    State(app_state): State<AppState>,
    Path((number, field)): Path<(String, String)>,
    payload: Result<Json<FormFieldPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let lead = app_state
        .lead_service
        .update_form_field(&number, &field, &payload.value)
        .await?;
    Ok((StatusCode::OK, Json(lead)))
}

// src/common/error.rs

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::whatsapp::ClientError;

// Erro único da aplicação. Cada variante sabe qual status HTTP devolver.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Corpo ausente, sem content-type ou que não bate com o payload
    #[error("{}", .0.body_text())]
    InvalidJson(#[from] JsonRejection),

    #[error("Lead não encontrado")]
    LeadNotFound,

    #[error("Contato não encontrado")]
    ContactNotFound,

    #[error("Cliente WhatsApp não está pronto")]
    ClientNotReady,

    #[error("Campo de formulário inválido: {0}")]
    InvalidFormField(String),

    #[error("Token do webhook inválido")]
    InvalidWebhookToken,

    // Falha de leitura/escrita do arquivo de leads
    #[error("Erro de armazenamento: {0}")]
    StorageError(#[from] std::io::Error),

    // O arquivo existe mas não é um JSON válido
    #[error("Arquivo de leads corrompido: {0}")]
    CorruptStore(#[from] serde_json::Error),

    #[error("Erro do cliente WhatsApp: {0}")]
    ClientError(#[from] ClientError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// `NotReady` do gateway (corrida com uma recriação) vira 503, o resto 500.
    pub fn from_client(error: ClientError) -> Self {
        match error {
            ClientError::NotReady => AppError::ClientNotReady,
            other => AppError::ClientError(other),
        }
    }

    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Um ou mais campos são inválidos."),
            AppError::InvalidJson(rejection) => (rejection.status(), "JSON inválido"),
            AppError::LeadNotFound => (StatusCode::NOT_FOUND, "Lead não encontrado"),
            AppError::ContactNotFound => (StatusCode::NOT_FOUND, "Contato não encontrado"),
            AppError::ClientNotReady => (StatusCode::SERVICE_UNAVAILABLE, "Cliente WhatsApp não está pronto"),
            AppError::InvalidFormField(_) => (StatusCode::BAD_REQUEST, "Campo de formulário inválido"),
            AppError::InvalidWebhookToken => (StatusCode::UNAUTHORIZED, "Token do webhook inválido ou ausente."),
            AppError::StorageError(_) | AppError::CorruptStore(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro ao acessar os leads")
            }
            AppError::ClientError(_) | AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!("❌ Erro Interno do Servidor: {}", self);
        }

        // Erros de validação devolvem o mapa campo -> mensagens
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({ "error": error_message, "details": details }));
            return (status, body).into_response();
        }

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string(),
        }));
        (status, body).into_response()
    }
}

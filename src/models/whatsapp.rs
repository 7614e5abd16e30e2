// src/models/whatsapp.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
//  STATUS DA CONEXÃO
// =============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Connecting,
    Ready,
    Failed,
}

// O que a API e as páginas enxergam da conexão
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub ready: bool,
    // Payload do QR Code pendente de leitura
    pub qr_code: Option<String>,
    pub connecting: bool,
    pub last_error: Option<String>,
    pub state: ConnectionState,
}

// Resposta dos comandos manuais (reconnect/recreate)
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn accepted(message: &str) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn busy() -> Self {
        Self {
            success: false,
            message: "Já existe uma tentativa de conexão em andamento".to_string(),
        }
    }
}

// =============================================================================
//  OBJETOS DO WHATSAPP
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    // ID serializado, ex: "5511999@c.us"
    pub id: String,
    pub number: String,
    pub name: Option<String>,
    pub pushname: Option<String>,
    pub is_group: bool,
    // IDs das etiquetas do WhatsApp Business
    pub labels: Vec<String>,
}

impl Contact {
    /// Nome de exibição com fallback para o apelido e depois "Desconhecido".
    pub fn display_name(&self) -> String {
        [&self.name, &self.pushname]
            .into_iter()
            .flatten()
            .find(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "Desconhecido".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hex_color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Chat {
    pub id: String,
    pub name: Option<String>,
    pub is_group: bool,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    // ID do chat de origem, ex: "5511999@c.us"
    pub from: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_group: bool,
}

// =============================================================================
//  EVENTOS DO CLIENTE
// =============================================================================

// Tudo que o cliente de automação pode emitir.
// Formato no fio: { "event": "auth_failure", "data": { "message": "..." } }
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Qr { code: String },
    Ready,
    AuthFailure { message: String },
    Disconnected { reason: String },
    Error { message: String },
    Message(InboundMessage),
    ContactChanged { contact_id: String },
    GroupUpdate { chat_id: String },
}

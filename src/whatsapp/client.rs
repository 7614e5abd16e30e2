// src/whatsapp/client.rs

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::whatsapp::{Chat, ClientEvent, Contact, Label};

// Assinatura do erro de transporte quando o navegador por trás do cliente morreu
const TARGET_CLOSED_SIGNATURE: &str = "target closed";

// Canal por onde uma instância do cliente entrega seus eventos
pub type EventSink = mpsc::UnboundedSender<ClientEvent>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cliente não está pronto")]
    NotReady,

    #[error("falha na inicialização: {0}")]
    Initialization(String),

    #[error("erro de protocolo: {0}")]
    Protocol(String),

    #[error("gateway respondeu {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("erro HTTP: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// O navegador/página foi fechado: só recriar o cliente resolve.
    pub fn is_target_closed(&self) -> bool {
        is_target_closed_message(&self.to_string())
    }
}

pub fn is_target_closed_message(message: &str) -> bool {
    message.to_lowercase().contains(TARGET_CLOSED_SIGNATURE)
}

/// Operações que o resto do sistema usa do cliente de automação.
#[async_trait]
pub trait WhatsAppClient: Send + Sync {
    /// Sobe a sessão. Pronto/QR chegam depois como eventos.
    async fn initialize(&self) -> Result<(), ClientError>;

    /// Encerra a sessão e solta os listeners desta instância.
    async fn destroy(&self) -> Result<(), ClientError>;

    async fn get_labels(&self) -> Result<Vec<Label>, ClientError>;

    async fn get_contact_by_id(&self, contact_id: &str) -> Result<Option<Contact>, ClientError>;

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>, ClientError>;

    async fn get_group_participants(&self, chat_id: &str) -> Result<Vec<String>, ClientError>;
}

/// Cria instâncias novas do cliente, cada uma ligada ao seu próprio canal de eventos.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(&self, events: EventSink) -> Result<Arc<dyn WhatsAppClient>, ClientError>;
}

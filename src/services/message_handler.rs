// src/services/message_handler.rs

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    common::{error::AppError, phone::normalize_number},
    models::whatsapp::{ClientEvent, Contact, InboundMessage},
    services::{
        lead_service::{is_form_submission, LeadService},
        tag_service::TagService,
    },
    whatsapp::ConnectionSupervisor,
};

const GROUP_SUFFIX: &str = "@g.us";

/// Consome os eventos de domínio do cliente e os transforma em leads.
#[derive(Clone)]
pub struct MessageHandler {
    leads: LeadService,
    tags: TagService,
    supervisor: Arc<ConnectionSupervisor>,
}

impl MessageHandler {
    pub fn new(leads: LeadService, tags: TagService, supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self { leads, tags, supervisor }
    }

    /// Loop principal; termina quando o supervisor é descartado.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
        tracing::info!("📨 Processador de mensagens iniciado");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::info!("📪 Canal de eventos encerrado");
    }

    /// Um evento com erro é registrado e não interrompe os seguintes.
    pub async fn handle_event(&self, event: ClientEvent) {
        let result = match event {
            ClientEvent::Message(message) => self.handle_message(message).await,
            ClientEvent::ContactChanged { contact_id } => self.handle_contact_changed(&contact_id).await,
            ClientEvent::GroupUpdate { chat_id } => self.handle_group_update(&chat_id).await,
            other => {
                tracing::debug!("Evento de ciclo de vida ignorado pelo processador: {:?}", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!("❌ Erro ao processar evento: {}", e);
        }
    }

    // =========================================================================
    //  MENSAGENS
    // =========================================================================

    pub async fn handle_message(&self, message: InboundMessage) -> Result<(), AppError> {
        if message.is_group || message.from.ends_with(GROUP_SUFFIX) {
            tracing::debug!("Mensagem de grupo ignorada: {}", message.from);
            return Ok(());
        }

        let contact = self.resolve_contact(&message.from).await;
        let number = contact_number(&contact, &message.from);
        let name = contact.display_name();
        tracing::info!("📱 Mensagem recebida de {} ({}): {}", name, number, message.body);

        let tags = self.tags.resolve(&contact).await;

        if is_form_submission(&message.body) {
            self.leads
                .register_form_submission(&number, &name, &message.body, &tags)
                .await?;
            tracing::info!("📝 Formulário enviado para {} ({})", name, number);
            return Ok(());
        }

        let (lead, created) = self.leads.record_message(&number, &name, &message.body, &tags).await?;
        if created {
            tracing::info!("🆕 Novo lead capturado: {} ({})", name, number);
        } else {
            tracing::info!("💬 Lead {} atualizado ({} interações)", number, lead.interactions);
        }
        if !lead.products.is_empty() {
            tracing::debug!("🛒 Produtos de {}: {:?}", number, lead.products);
        }
        Ok(())
    }

    // =========================================================================
    //  CONTATOS E GRUPOS
    // =========================================================================

    pub async fn handle_contact_changed(&self, contact_id: &str) -> Result<(), AppError> {
        let id = contact_id.to_string();
        let found = self
            .supervisor
            .safe_operation("buscar contato alterado", None, |client| async move {
                client.get_contact_by_id(&id).await
            })
            .await;

        let Some(contact) = found else {
            tracing::warn!("⚠️ Contato alterado não encontrado: {}", contact_id);
            return Ok(());
        };
        if contact.is_group {
            return Ok(());
        }

        let number = contact_number(&contact, contact_id);
        let tags = self.tags.resolve(&contact).await;
        let lead = self.leads.sync_contact_tags(&number, &contact.display_name(), &tags).await?;
        tracing::info!("🏷️ Tags sincronizadas para {}: {:?}", number, lead.tags);
        Ok(())
    }

    pub async fn handle_group_update(&self, chat_id: &str) -> Result<(), AppError> {
        let id = chat_id.to_string();
        let participants = self
            .supervisor
            .safe_operation("listar participantes", Vec::new(), |client| async move {
                client.get_group_participants(&id).await
            })
            .await;

        tracing::info!("👥 Grupo {} atualizado ({} participantes)", chat_id, participants.len());
        for participant in participants {
            if let Err(e) = self.handle_contact_changed(&participant).await {
                tracing::warn!("⚠️ Erro ao sincronizar participante {}: {}", participant, e);
            }
        }
        Ok(())
    }

    // Sem cliente pronto, o contato é montado só com o ID de origem
    async fn resolve_contact(&self, from: &str) -> Contact {
        let id = from.to_string();
        let found = self
            .supervisor
            .safe_operation("buscar contato", None, |client| async move {
                client.get_contact_by_id(&id).await
            })
            .await;

        found.unwrap_or_else(|| Contact {
            id: from.to_string(),
            number: normalize_number(from),
            ..Contact::default()
        })
    }
}

fn contact_number(contact: &Contact, fallback_id: &str) -> String {
    let number = normalize_number(&contact.number);
    if number.is_empty() { normalize_number(fallback_id) } else { number }
}

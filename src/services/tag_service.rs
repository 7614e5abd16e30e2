// src/services/tag_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, phone::to_contact_id},
    models::{lead::merge_unique, whatsapp::Contact},
    whatsapp::{ConnectionSupervisor, WhatsAppClient},
};

/// Etiquetas do WhatsApp Business de um contato, na ordem em que aparecem.
///
/// 1. IDs de etiqueta do contato cruzados com o catálogo completo de etiquetas;
/// 2. se nada saiu daí, etiquetas presas direto no chat do contato.
///
/// Falha em qualquer etapa conta como "nenhuma tag desta fonte".
pub async fn resolve_tags(client: &dyn WhatsAppClient, contact: &Contact) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    if !contact.labels.is_empty() {
        match client.get_labels().await {
            Ok(all_labels) => {
                let names: Vec<String> = contact
                    .labels
                    .iter()
                    .filter_map(|label_id| all_labels.iter().find(|l| &l.id == label_id))
                    .map(|label| label.name.clone())
                    .collect();
                merge_unique(&mut tags, &names);
            }
            Err(e) => tracing::warn!("⚠️ Erro ao obter labels do WhatsApp Business: {}", e),
        }
    } else {
        tracing::debug!("Contato {} não possui labels", contact.id);
    }

    if tags.is_empty() {
        match client.get_chat_by_id(&contact.id).await {
            Ok(Some(chat)) => merge_unique(&mut tags, &chat.labels),
            Ok(None) => tracing::debug!("Chat de {} não encontrado", contact.id),
            Err(e) => tracing::warn!("⚠️ Erro ao obter labels do chat: {}", e),
        }
    }

    tracing::debug!("🏷️ Tags de {}: {:?}", contact.id, tags);
    tags
}

#[derive(Clone)]
pub struct TagService {
    supervisor: Arc<ConnectionSupervisor>,
}

impl TagService {
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self { supervisor }
    }

    /// Versão tolerante: cliente fora do ar devolve lista vazia.
    pub async fn resolve(&self, contact: &Contact) -> Vec<String> {
        let contact = contact.clone();
        self.supervisor
            .safe_operation("resolver tags", Vec::new(), |client| async move {
                Ok(resolve_tags(client.as_ref(), &contact).await)
            })
            .await
    }

    /// Busca o contato e resolve suas tags sob demanda (rota de atualização manual).
    ///
    /// Diferente de `resolve`, os erros chegam ao chamador; "Target closed"
    /// ainda é repassado ao supervisor para recriar o cliente.
    pub async fn fetch_contact_tags(&self, number: &str) -> Result<Vec<String>, AppError> {
        let client = self.supervisor.ready_client().ok_or(AppError::ClientNotReady)?;
        let contact = match client.get_contact_by_id(&to_contact_id(number)).await {
            Ok(Some(contact)) => contact,
            Ok(None) => return Err(AppError::ContactNotFound),
            Err(e) => {
                tracing::warn!("⚠️ Erro ao buscar contato {}: {}", number, e);
                if e.is_target_closed() {
                    self.supervisor.report_fault(&e.to_string());
                }
                return Err(AppError::from_client(e));
            }
        };
        Ok(resolve_tags(client.as_ref(), &contact).await)
    }
}

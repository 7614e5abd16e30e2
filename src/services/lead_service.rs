// src/services/lead_service.rs

use chrono::Utc;

use crate::{
    common::{error::AppError, phone::normalize_number},
    db::{LeadRepository, ProductRepository},
    models::{
        lead::{merge_unique, FormData, FormStatus, Lead, LeadsMap, UpdateLeadPayload},
        metrics::LeadMetrics,
        product::ProductStats,
    },
    services::{metrics_service, product_matcher},
};

// Rótulos que identificam a mensagem de formulário enviada pelo atendente
const FORM_LABELS: [&str; 6] = ["Nome:", "CPF:", "Email:", "Telefone:", "Endereço:", "CEP:"];

/// A mensagem traz os seis rótulos do formulário? Os valores não são lidos.
pub fn is_form_submission(message: &str) -> bool {
    FORM_LABELS.iter().all(|label| message.contains(label))
}

pub enum DeleteOutcome {
    Deleted,
    NotFound { available_numbers: Vec<String> },
}

#[derive(Clone)]
pub struct LeadService {
    repo: LeadRepository,
    products: ProductRepository,
}

impl LeadService {
    pub fn new(repo: LeadRepository, products: ProductRepository) -> Self {
        Self { repo, products }
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn list(&self) -> Result<LeadsMap, AppError> {
        self.repo.get_all().await
    }

    pub async fn get(&self, number: &str) -> Result<Lead, AppError> {
        let key = normalize_number(number);
        self.repo.get_all().await?.remove(&key).ok_or(AppError::LeadNotFound)
    }

    pub async fn metrics(&self) -> Result<LeadMetrics, AppError> {
        let leads = self.repo.get_all().await?;
        Ok(metrics_service::calculate_metrics(&leads))
    }

    pub async fn product_stats(&self) -> Result<Vec<ProductStats>, AppError> {
        let leads = self.repo.get_all().await?;
        Ok(product_matcher::product_stats(&leads, self.products.all()))
    }

    // =========================================================================
    //  MENSAGENS RECEBIDAS
    // =========================================================================

    /// Cria o lead na primeira mensagem ou registra mais uma interação.
    ///
    /// Devolve o lead atualizado e se ele acabou de ser criado.
    pub async fn record_message(
        &self,
        number: &str,
        name: &str,
        message: &str,
        tags: &[String],
    ) -> Result<(Lead, bool), AppError> {
        let key = normalize_number(number);
        let detected = product_matcher::detect_products(message, self.products.all());

        self.repo
            .update(|leads| {
                if let Some(lead) = leads.get_mut(&key) {
                    // Qualquer resposta depois do formulário conta como concluído
                    if lead.form_status == FormStatus::EmAndamento {
                        lead.form_status = FormStatus::Completo;
                    }
                    lead.record_interaction(message, &detected, tags);
                    return Ok((lead.clone(), false));
                }

                let lead = Lead::from_first_message(name, message, detected, tags.to_vec(), Utc::now());
                leads.insert(key.clone(), lead.clone());
                Ok((lead, true))
            })
            .await
    }

    /// Mensagem de formulário: garante o lead e marca o fluxo como em andamento.
    pub async fn register_form_submission(
        &self,
        number: &str,
        name: &str,
        message: &str,
        tags: &[String],
    ) -> Result<Lead, AppError> {
        let key = normalize_number(number);
        let detected = product_matcher::detect_products(message, self.products.all());

        self.repo
            .update(|leads| {
                let lead = leads.entry(key.clone()).or_insert_with(|| {
                    Lead::from_first_message(name, message, detected, tags.to_vec(), Utc::now())
                });
                lead.form_status = FormStatus::EmAndamento;
                Ok(lead.clone())
            })
            .await
    }

    // =========================================================================
    //  TAGS
    // =========================================================================

    /// Une as tags novas às existentes. O lead precisa existir.
    pub async fn merge_tags(&self, number: &str, tags: &[String]) -> Result<Vec<String>, AppError> {
        let key = normalize_number(number);
        self.repo
            .update(|leads| {
                let lead = leads.get_mut(&key).ok_or(AppError::LeadNotFound)?;
                merge_unique(&mut lead.tags, tags);
                Ok(lead.tags.clone())
            })
            .await
    }

    /// Une as tags ou cria um lead mínimo para o contato.
    pub async fn sync_contact_tags(&self, number: &str, name: &str, tags: &[String]) -> Result<Lead, AppError> {
        let key = normalize_number(number);
        self.repo
            .update(|leads| {
                let lead = leads
                    .entry(key.clone())
                    .and_modify(|lead| merge_unique(&mut lead.tags, tags))
                    .or_insert_with(|| Lead::from_contact(name, tags.to_vec(), Utc::now()));
                Ok(lead.clone())
            })
            .await
    }

    // =========================================================================
    //  EDIÇÃO MANUAL
    // =========================================================================

    pub async fn update(&self, number: &str, payload: UpdateLeadPayload) -> Result<Lead, AppError> {
        let key = normalize_number(number);
        self.repo
            .update(|leads| {
                let lead = leads.get_mut(&key).ok_or(AppError::LeadNotFound)?;

                if let Some(name) = payload.name {
                    lead.name = name;
                }
                if let Some(status) = payload.status {
                    lead.status = status;
                }
                if let Some(form_data) = payload.form_data {
                    lead.form_data.apply(form_data);
                }
                if let Some(tags) = payload.tags {
                    lead.tags.clear();
                    merge_unique(&mut lead.tags, &tags);
                }

                Ok(lead.clone())
            })
            .await
    }

    /// Atualiza um campo do formulário e recalcula o status do fluxo.
    pub async fn update_form_field(&self, number: &str, field: &str, value: &str) -> Result<Lead, AppError> {
        if !FormData::FIELDS.contains(&field) {
            return Err(AppError::InvalidFormField(field.to_string()));
        }

        let key = normalize_number(number);
        self.repo
            .update(|leads| {
                let lead = leads.get_mut(&key).ok_or(AppError::LeadNotFound)?;
                let target = lead
                    .form_data
                    .field_mut(field)
                    .ok_or_else(|| AppError::InvalidFormField(field.to_string()))?;
                *target = value.to_string();

                lead.form_status = if lead.form_data.is_complete() {
                    FormStatus::Completo
                } else {
                    FormStatus::EmAndamento
                };
                Ok(lead.clone())
            })
            .await
    }

    pub async fn delete(&self, number: &str) -> Result<DeleteOutcome, AppError> {
        let key = normalize_number(number);
        let removed = self
            .repo
            .update(|leads| leads.remove(&key).map(|_| ()).ok_or(AppError::LeadNotFound))
            .await;

        match removed {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(AppError::LeadNotFound) => {
                let available_numbers = self.repo.get_all().await?.into_keys().collect();
                Ok(DeleteOutcome::NotFound { available_numbers })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{lead::FormDataPatch, product::Product};

    fn service(dir: &tempfile::TempDir) -> LeadService {
        let products = ProductRepository::new(vec![Product {
            name: "Café Especial 250g".into(),
            variations: vec!["cafe especial".into()],
        }]);
        LeadService::new(LeadRepository::new(dir.path().join("leads.json")), products)
    }

    #[tokio::test]
    async fn first_message_creates_lead_with_products() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);

        let (lead, created) = svc
            .record_message("5511999", "Ana", "Hi, I want the Café Especial 250g", &[])
            .await
            .unwrap();

        assert!(created);
        assert_eq!(lead.interactions, 1);
        assert_eq!(lead.products, vec!["Café Especial 250g"]);
        assert_eq!(lead.form_status, FormStatus::Pendente);
        assert_eq!(lead.status, "Novo");
        assert_eq!(lead.form_data, FormData::default());
    }

    #[tokio::test]
    async fn interactions_follow_arrival_order_and_sets_only_grow() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);

        svc.record_message("5511999@c.us", "Ana", "cafe especial?", &["VIP".into()]).await.unwrap();
        svc.record_message("5511999", "Ana", "oi", &[]).await.unwrap();
        let (lead, created) = svc
            .record_message("5511999", "Ana", "tchau", &["Pago".into(), "VIP".into()])
            .await
            .unwrap();

        assert!(!created);
        assert_eq!(lead.interactions, 3);
        assert_eq!(lead.messages, vec!["cafe especial?", "oi", "tchau"]);
        assert_eq!(lead.products, vec!["Café Especial 250g"]);
        assert_eq!(lead.tags, vec!["VIP", "Pago"]);
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn form_flow_moves_to_complete_on_next_message() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let form = "Nome:\nCPF:\nEmail:\nTelefone:\nEndereço:\nCEP:";
        assert!(is_form_submission(form));

        let lead = svc.register_form_submission("5511999", "Ana", form, &[]).await.unwrap();
        assert_eq!(lead.form_status, FormStatus::EmAndamento);

        let (lead, _) = svc.record_message("5511999", "Ana", "preenchido!", &[]).await.unwrap();
        assert_eq!(lead.form_status, FormStatus::Completo);
    }

    #[test]
    fn partial_form_is_not_a_submission() {
        assert!(!is_form_submission("Nome: Ana\nCPF: 123"));
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let (original, _) = svc.record_message("5511999", "Ana", "oi", &["VIP".into()]).await.unwrap();

        let payload = UpdateLeadPayload {
            name: None,
            status: Some("Contatado".into()),
            form_data: Some(FormDataPatch { email: Some("ana@email.com".into()), ..Default::default() }),
            tags: None,
        };
        let updated = svc.update("5511999", payload).await.unwrap();

        assert_eq!(updated.status, "Contatado");
        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.tags, original.tags);
        assert_eq!(updated.timestamp, original.timestamp);
        assert_eq!(updated.form_data.email, "ana@email.com");
    }

    #[tokio::test]
    async fn form_field_updates_recompute_status() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        svc.record_message("5511999", "Ana", "oi", &[]).await.unwrap();

        let lead = svc.update_form_field("5511999", "nome", "Ana").await.unwrap();
        assert_eq!(lead.form_status, FormStatus::EmAndamento);

        for field in ["cpf", "email", "telefone", "endereco", "cep"] {
            svc.update_form_field("5511999", field, "x").await.unwrap();
        }
        assert_eq!(svc.get("5511999").await.unwrap().form_status, FormStatus::Completo);

        let err = svc.update_form_field("5511999", "idade", "30").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidFormField(_)));
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        svc.record_message("1", "A", "oi", &[]).await.unwrap();
        svc.record_message("2", "B", "oi", &[]).await.unwrap();

        match svc.delete("3").await.unwrap() {
            DeleteOutcome::NotFound { available_numbers } => assert_eq!(available_numbers, vec!["1", "2"]),
            DeleteOutcome::Deleted => panic!("não deveria remover"),
        }
        assert_eq!(svc.list().await.unwrap().len(), 2);

        assert!(matches!(svc.delete("1").await.unwrap(), DeleteOutcome::Deleted));
        let remaining = svc.list().await.unwrap();
        assert_eq!(remaining.keys().collect::<Vec<_>>(), vec!["2"]);
    }

    #[tokio::test]
    async fn merge_tags_requires_existing_lead() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        assert!(matches!(svc.merge_tags("1", &["VIP".into()]).await, Err(AppError::LeadNotFound)));

        let lead = svc.sync_contact_tags("1@c.us", "A", &["VIP".into()]).await.unwrap();
        assert_eq!(lead.interactions, 0);
        let tags = svc.merge_tags("1", &["Novo".into(), "VIP".into()]).await.unwrap();
        assert_eq!(tags, vec!["VIP", "Novo"]);
    }
}

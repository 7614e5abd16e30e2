// src/models/lead.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Documento inteiro do arquivo de leads: número -> lead
pub type LeadsMap = BTreeMap<String, Lead>;

// Status inicial de todo lead capturado pelo bot
pub const DEFAULT_LEAD_STATUS: &str = "Novo";

// --- ENUMS ---

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Pendente,
    EmAndamento,
    Completo,
}

// --- FORMULÁRIO ---

// Os seis campos fixos do formulário enviado pelo WhatsApp
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct FormData {
    #[schema(example = "Maria da Silva")]
    pub nome: String,
    #[schema(example = "123.456.789-00")]
    pub cpf: String,
    #[schema(example = "maria@email.com")]
    pub email: String,
    #[schema(example = "(11) 99999-8888")]
    pub telefone: String,
    #[schema(example = "Rua das Flores, 123")]
    pub endereco: String,
    #[schema(example = "01001-000")]
    pub cep: String,
}

impl FormData {
    pub const FIELDS: [&'static str; 6] = ["nome", "cpf", "email", "telefone", "endereco", "cep"];

    pub fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "nome" => Some(&mut self.nome),
            "cpf" => Some(&mut self.cpf),
            "email" => Some(&mut self.email),
            "telefone" => Some(&mut self.telefone),
            "endereco" => Some(&mut self.endereco),
            "cep" => Some(&mut self.cep),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.nome, &self.cpf, &self.email, &self.telefone, &self.endereco, &self.cep]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    /// Aplica somente os campos presentes no patch.
    pub fn apply(&mut self, patch: FormDataPatch) {
        let FormDataPatch { nome, cpf, email, telefone, endereco, cep } = patch;
        for (target, value) in [
            (&mut self.nome, nome),
            (&mut self.cpf, cpf),
            (&mut self.email, email),
            (&mut self.telefone, telefone),
            (&mut self.endereco, endereco),
            (&mut self.cep, cep),
        ] {
            if let Some(value) = value {
                *target = value;
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FormDataPatch {
    pub nome: Option<String>,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub endereco: Option<String>,
    pub cep: Option<String>,
}

// --- LEAD ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[schema(example = "Maria")]
    pub name: String,

    // Data de criação, nunca alterada depois
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub interactions: u64,

    // Histórico completo, em ordem de chegada
    #[serde(default)]
    pub messages: Vec<String>,

    #[serde(default)]
    pub products: Vec<String>,

    #[serde(default)]
    #[schema(example = json!(["Cliente VIP"]))]
    pub tags: Vec<String>,

    #[serde(default = "default_status")]
    #[schema(example = "Novo")]
    pub status: String,

    #[serde(default)]
    pub form_status: FormStatus,

    #[serde(default)]
    pub form_data: FormData,
}

fn default_status() -> String {
    DEFAULT_LEAD_STATUS.to_string()
}

impl Lead {
    /// Lead criado a partir da primeira mensagem recebida.
    pub fn from_first_message(
        name: &str,
        message: &str,
        products: Vec<String>,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.to_string(),
            timestamp: now,
            interactions: 1,
            messages: vec![message.to_string()],
            products,
            tags,
            status: default_status(),
            form_status: FormStatus::Pendente,
            form_data: FormData::default(),
        }
    }

    /// Lead mínimo, sem mensagens (ex.: contato atualizado antes de escrever).
    pub fn from_contact(name: &str, tags: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            timestamp: now,
            interactions: 0,
            messages: Vec::new(),
            products: Vec::new(),
            tags,
            status: default_status(),
            form_status: FormStatus::Pendente,
            form_data: FormData::default(),
        }
    }

    /// Registra uma nova mensagem e une produtos/tags sem nunca remover nada.
    pub fn record_interaction(&mut self, message: &str, products: &[String], tags: &[String]) {
        self.interactions += 1;
        self.messages.push(message.to_string());
        merge_unique(&mut self.products, products);
        merge_unique(&mut self.tags, tags);
    }
}

/// União preservando a ordem de descoberta.
pub fn merge_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !item.is_empty() && !target.contains(item) {
            target.push(item.clone());
        }
    }
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    #[validate(length(min = 1, message = "O nome não pode ser vazio"))]
    #[schema(example = "Maria da Silva")]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "O status não pode ser vazio"))]
    #[schema(example = "Contatado")]
    pub status: Option<String>,

    pub form_data: Option<FormDataPatch>,

    // Substitui o conjunto inteiro de tags (edição manual)
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FormFieldPayload {
    #[validate(length(max = 500, message = "Valor muito longo"))]
    #[schema(example = "maria@email.com")]
    pub value: String,
}

// --- RESPOSTAS ---

#[derive(Debug, Serialize, ToSchema)]
pub struct TagUpdateResponse {
    pub success: bool,
    pub tags: Vec<String>,
    pub message: String,
}

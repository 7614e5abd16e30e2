// src/common/phone.rs

// Sufixo que o WhatsApp usa nos IDs de contatos individuais
pub const CONTACT_SUFFIX: &str = "@c.us";

/// Normaliza um número vindo do WhatsApp ou da URL para a chave do lead.
///
/// Remove qualquer sufixo de protocolo (`@c.us`, `@s.whatsapp.net`, ...),
/// espaços e o `+` inicial. Todas as leituras e escritas no arquivo de leads
/// passam por aqui, para que o mesmo contato nunca gere duas chaves.
pub fn normalize_number(raw: &str) -> String {
    let without_suffix = raw.split('@').next().unwrap_or(raw);
    without_suffix.trim().trim_start_matches('+').to_string()
}

/// Monta o ID serializado do contato a partir de um número.
pub fn to_contact_id(number: &str) -> String {
    format!("{}{}", normalize_number(number), CONTACT_SUFFIX)
}

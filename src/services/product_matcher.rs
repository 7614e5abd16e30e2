// src/services/product_matcher.rs

use chrono::{DateTime, Utc};

use crate::models::{
    lead::LeadsMap,
    product::{MentionStats, Product, ProductStats},
};

// Produto casa se o nome OU alguma variação aparece como substring,
// sem diferenciar maiúsculas. Não é busca por palavra inteira.
// Nome ou variação em branco nunca casa.
fn mentions(message_lower: &str, product: &Product) -> bool {
    (!product.name.trim().is_empty() && message_lower.contains(&product.name.to_lowercase()))
        || product
            .variations
            .iter()
            .filter(|v| !v.trim().is_empty())
            .any(|variation| message_lower.contains(&variation.to_lowercase()))
}

/// Nomes dos produtos citados na mensagem, na ordem do catálogo.
pub fn detect_products(message: &str, products: &[Product]) -> Vec<String> {
    let message_lower = message.to_lowercase();
    let mut detected: Vec<String> = Vec::new();

    for product in products {
        if mentions(&message_lower, product) && !detected.contains(&product.name) {
            detected.push(product.name.clone());
        }
    }

    detected
}

/// Degraus de tendência pelo número absoluto de menções.
pub fn trend_for(mentions: u64) -> u8 {
    match mentions {
        m if m >= 5 => 100,
        m if m >= 3 => 75,
        m if m >= 1 => 50,
        _ => 0,
    }
}

/// Estatísticas por produto sobre o histórico de todos os leads,
/// ordenadas por menções (decrescente).
///
/// As mensagens não guardam horário próprio, então a última menção usa a data
/// de criação do lead que citou o produto.
pub fn product_stats(leads: &LeadsMap, products: &[Product]) -> Vec<ProductStats> {
    let mut stats: Vec<ProductStats> = products
        .iter()
        .map(|product| {
            let mut count: u64 = 0;
            let mut last_mention: Option<DateTime<Utc>> = None;

            for lead in leads.values() {
                for message in &lead.messages {
                    if mentions(&message.to_lowercase(), product) {
                        count += 1;
                        if last_mention.is_none_or(|last| lead.timestamp > last) {
                            last_mention = Some(lead.timestamp);
                        }
                    }
                }
            }

            ProductStats {
                name: product.name.clone(),
                stats: MentionStats {
                    mentions: count,
                    last_mention,
                    trend: trend_for(count),
                },
            }
        })
        .collect();

    stats.sort_by(|a, b| b.stats.mentions.cmp(&a.stats.mentions));
    stats
}

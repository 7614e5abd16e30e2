// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Produto do catálogo estático (config/products.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Product {
    #[schema(example = "Café Especial 250g")]
    pub name: String,

    // Outras formas de escrever o produto, usadas na detecção
    #[serde(default)]
    #[schema(example = json!(["cafe especial"]))]
    pub variations: Vec<String>,
}

// Formato do arquivo de configuração
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductCatalogFile {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MentionStats {
    pub mentions: u64,
    pub last_mention: Option<DateTime<Utc>>,
    // 0, 50, 75 ou 100
    pub trend: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct ProductStats {
    pub name: String,
    pub stats: MentionStats,
}

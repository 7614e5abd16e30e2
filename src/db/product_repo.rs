// src/db/product_repo.rs

use std::{path::Path, sync::Arc};

use crate::models::product::{Product, ProductCatalogFile};

// Catálogo de produtos carregado uma vez na inicialização (somente leitura)
#[derive(Clone, Default)]
pub struct ProductRepository {
    products: Arc<Vec<Product>>,
}

impl ProductRepository {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products: Arc::new(products) }
    }

    /// Carrega o arquivo de configuração. Qualquer falha vira catálogo vazio.
    pub async fn load(path: &Path) -> Self {
        let products = match tokio::fs::read_to_string(path).await {
            Ok(data) => match serde_json::from_str::<ProductCatalogFile>(&data) {
                Ok(file) => file.products,
                Err(e) => {
                    tracing::error!("❌ Erro ao interpretar catálogo de produtos {:?}: {}", path, e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("⚠️ Catálogo de produtos indisponível em {:?}: {}", path, e);
                Vec::new()
            }
        };

        tracing::info!("📦 {} produtos carregados", products.len());
        Self::new(products)
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }
}

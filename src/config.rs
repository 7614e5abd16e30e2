// src/config.rs

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use tokio::sync::mpsc;

use crate::{
    db::{LeadRepository, ProductRepository},
    models::whatsapp::ClientEvent,
    services::{LeadService, MessageHandler, TagService},
    whatsapp::{ClientFactory, ConnectionSupervisor, GatewayConfig, GatewayFactory, RetryPolicy, WebhookHub},
};

const PRODUCTION_BROWSER: &str = "/usr/bin/chromium-browser";
const PRODUCTION_SESSION_DIR: &str = "/tmp/.wwebjs_auth";
const LOCAL_SESSION_DIR: &str = "./.wwebjs_auth";

// =============================================================================
//  CONFIGURAÇÕES
// =============================================================================

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub production: bool,
    pub leads_file: PathBuf,
    pub products_file: PathBuf,
    pub gateway_url: String,
    // Também exigida no header `apikey` dos webhooks, quando definida
    pub gateway_api_key: Option<String>,
    pub public_url: String,
    pub session_name: String,
    pub browser_executable: Option<String>,
    pub session_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta as configurações a partir de qualquer fonte chave -> valor.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().with_context(|| format!("PORT inválida: {}", raw))?,
            None => 3000,
        };
        let production = var("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let browser_executable = var("CHROMIUM_PATH").or_else(|| production.then(|| PRODUCTION_BROWSER.to_string()));
        let session_dir = var("WA_SESSION_DIR")
            .unwrap_or_else(|| if production { PRODUCTION_SESSION_DIR } else { LOCAL_SESSION_DIR }.to_string());

        Ok(Self {
            port,
            production,
            leads_file: var("LEADS_FILE").unwrap_or_else(|| "leads.json".into()).into(),
            products_file: var("PRODUCTS_FILE").unwrap_or_else(|| "config/products.json".into()).into(),
            gateway_url: var("WA_GATEWAY_URL").unwrap_or_else(|| "http://127.0.0.1:8085".into()),
            gateway_api_key: var("WA_GATEWAY_API_KEY"),
            public_url: var("PUBLIC_URL").unwrap_or_else(|| format!("http://127.0.0.1:{}", port)),
            session_name: var("WA_SESSION_NAME").unwrap_or_else(|| "default".into()),
            browser_executable,
            session_dir: session_dir.into(),
        })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.gateway_url.clone(),
            api_key: self.gateway_api_key.clone(),
            session_name: self.session_name.clone(),
            webhook_url: format!("{}/webhook/whatsapp", self.public_url.trim_end_matches('/')),
            browser_executable: self.browser_executable.clone(),
            session_dir: self.session_dir.clone(),
        }
    }
}

// =============================================================================
//  ESTADO DA APLICAÇÃO
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub lead_service: LeadService,
    pub tag_service: TagService,
    pub supervisor: Arc<ConnectionSupervisor>,
    pub webhook_hub: WebhookHub,
}

impl AppState {
    /// Lê o ambiente e monta o estado com o cliente do gateway.
    ///
    /// O receiver devolvido alimenta o `MessageHandler`.
    pub async fn new() -> anyhow::Result<(Self, mpsc::UnboundedReceiver<ClientEvent>)> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        tokio::fs::create_dir_all(&settings.session_dir)
            .await
            .with_context(|| format!("Falha ao criar diretório de sessão {:?}", settings.session_dir))?;
        tracing::info!(
            "⚙️ Ambiente: {} | sessão em {:?}",
            if settings.production { "produção" } else { "desenvolvimento" },
            settings.session_dir
        );

        let webhook_hub = WebhookHub::default();
        let factory = Arc::new(GatewayFactory::new(settings.gateway_config(), webhook_hub.clone()));
        Ok(Self::build(settings, factory, webhook_hub).await)
    }

    // --- Monta o gráfico de dependências ---
    pub async fn build(
        settings: Settings,
        factory: Arc<dyn ClientFactory>,
        webhook_hub: WebhookHub,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let products = ProductRepository::load(&settings.products_file).await;
        let lead_repo = LeadRepository::new(settings.leads_file.clone());
        tracing::info!("📒 Leads em {:?}", lead_repo.path());
        let (supervisor, domain_events) = ConnectionSupervisor::new(factory, RetryPolicy::default());

        let state = Self {
            lead_service: LeadService::new(lead_repo, products),
            tag_service: TagService::new(Arc::clone(&supervisor)),
            supervisor,
            webhook_hub,
            settings: Arc::new(settings),
        };
        (state, domain_events)
    }

    pub fn message_handler(&self) -> MessageHandler {
        MessageHandler::new(self.lead_service.clone(), self.tag_service.clone(), Arc::clone(&self.supervisor))
    }
}

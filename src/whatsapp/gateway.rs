// src/whatsapp/gateway.rs

//! Cliente HTTP para o gateway de automação do WhatsApp.
//!
//! O gateway roda ao lado do serviço e controla o navegador headless com a
//! sessão do WhatsApp Web. Comandos vão por REST; eventos voltam como webhooks
//! em `POST /webhook/whatsapp`, entregues à instância atual pelo `WebhookHub`.

use std::{
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use super::client::{ClientError, ClientFactory, EventSink, WhatsAppClient};
use crate::models::whatsapp::{Chat, ClientEvent, Contact, Label};

// Mesmos argumentos usados no Chromium em produção
const BROWSER_ARGS: [&str; 8] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--single-process",
    "--disable-gpu",
];

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub session_name: String,
    // Para onde o gateway manda os eventos
    pub webhook_url: String,
    pub browser_executable: Option<String>,
    pub session_dir: PathBuf,
}

// =============================================================================
//  WEBHOOK HUB
// =============================================================================

/// Liga os webhooks recebidos ao canal da instância atual do cliente.
#[derive(Clone, Default)]
pub struct WebhookHub {
    listener: Arc<RwLock<Option<(Uuid, EventSink)>>>,
}

impl WebhookHub {
    pub fn attach(&self, instance_id: Uuid, sink: EventSink) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = Some((instance_id, sink));
    }

    /// Solta o listener, mas só se ainda for o da instância informada.
    pub fn detach(&self, instance_id: Uuid) {
        let mut listener = self.listener.write().unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|(id, _)| *id == instance_id) {
            *listener = None;
        }
    }

    /// Entrega o evento. `false` quando não há instância ouvindo.
    pub fn publish(&self, event: ClientEvent) -> bool {
        let listener = self.listener.read().unwrap_or_else(PoisonError::into_inner);
        match listener.as_ref() {
            Some((_, sink)) => sink.send(event).is_ok(),
            None => false,
        }
    }
}

// =============================================================================
//  FÁBRICA
// =============================================================================

pub struct GatewayFactory {
    http: reqwest::Client,
    config: Arc<GatewayConfig>,
    hub: WebhookHub,
}

impl GatewayFactory {
    pub fn new(config: GatewayConfig, hub: WebhookHub) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            hub,
        }
    }
}

#[async_trait]
impl ClientFactory for GatewayFactory {
    async fn create(&self, events: EventSink) -> Result<Arc<dyn WhatsAppClient>, ClientError> {
        let instance_id = Uuid::new_v4();
        self.hub.attach(instance_id, events);
        tracing::debug!("Instância {} ligada ao webhook", instance_id);

        Ok(Arc::new(GatewayClient {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            hub: self.hub.clone(),
            instance_id,
        }))
    }
}

// =============================================================================
//  CLIENTE
// =============================================================================

pub struct GatewayClient {
    http: reqwest::Client,
    config: Arc<GatewayConfig>,
    hub: WebhookHub,
    instance_id: Uuid,
}

impl GatewayClient {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/sessions/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.session_name,
            path
        );
        let builder = self.http.request(method, url);
        match &self.config.api_key {
            Some(key) => builder.header("apikey", key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(gateway_error(status, body))
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Protocol(format!("resposta inesperada do gateway: {}", e)))
    }

    // 404 vira `None`
    async fn fetch_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        match self.fetch(path).await {
            Ok(value) => Ok(Some(value)),
            Err(ClientError::Gateway { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn gateway_error(status: StatusCode, body: String) -> ClientError {
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return ClientError::NotReady;
    }
    ClientError::Gateway { status: status.as_u16(), body }
}

#[async_trait]
impl WhatsAppClient for GatewayClient {
    async fn initialize(&self) -> Result<(), ClientError> {
        let body = json!({
            "instanceId": self.instance_id,
            "webhookUrl": self.config.webhook_url,
            "authDir": self.config.session_dir,
            "puppeteer": {
                "headless": true,
                "args": BROWSER_ARGS,
                "executablePath": self.config.browser_executable,
            },
            "authTimeoutMs": 60_000,
            "qrMaxRetries": 3,
            "takeoverOnConflict": true,
        });

        self.send(self.request(Method::POST, "/start").json(&body))
            .await
            .map_err(|e| match e {
                ClientError::Gateway { body, .. } => ClientError::Initialization(body),
                other => other,
            })?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ClientError> {
        self.hub.detach(self.instance_id);
        self.send(self.request(Method::DELETE, "")).await?;
        Ok(())
    }

    async fn get_labels(&self) -> Result<Vec<Label>, ClientError> {
        self.fetch("/labels").await
    }

    async fn get_contact_by_id(&self, contact_id: &str) -> Result<Option<Contact>, ClientError> {
        self.fetch_optional(&format!("/contacts/{}", contact_id)).await
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>, ClientError> {
        self.fetch_optional(&format!("/chats/{}", chat_id)).await
    }

    async fn get_group_participants(&self, chat_id: &str) -> Result<Vec<String>, ClientError> {
        self.fetch(&format!("/groups/{}/participants", chat_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn hub_delivers_only_to_attached_instance() {
        let hub = WebhookHub::default();
        assert!(!hub.publish(ClientEvent::Ready));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let first = Uuid::new_v4();
        hub.attach(first, tx);
        assert!(hub.publish(ClientEvent::Ready));
        assert_eq!(rx.try_recv().unwrap(), ClientEvent::Ready);

        // Uma instância antiga não derruba o listener da nova
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let second = Uuid::new_v4();
        hub.attach(second, tx2);
        hub.detach(first);
        assert!(hub.publish(ClientEvent::Ready));

        hub.detach(second);
        assert!(!hub.publish(ClientEvent::Ready));
    }

    #[test]
    fn unavailable_gateway_means_not_ready() {
        assert!(matches!(
            gateway_error(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            ClientError::NotReady
        ));
        assert!(matches!(
            gateway_error(StatusCode::NOT_FOUND, "x".into()),
            ClientError::Gateway { status: 404, .. }
        ));
    }
}

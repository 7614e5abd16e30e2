// src/whatsapp/testing.rs

//! Cliente e fábrica falsos para os testes.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use super::client::{ClientError, ClientFactory, EventSink, WhatsAppClient};
use crate::models::whatsapp::{Chat, ClientEvent, Contact, Label};

#[derive(Clone)]
pub struct FakeClient {
    pub labels: Vec<Label>,
    pub contacts: HashMap<String, Contact>,
    pub chats: HashMap<String, Chat>,
    pub participants: HashMap<String, Vec<String>>,
    pub init_delay: Duration,
    pub init_error: Option<String>,
    pub labels_error: Option<String>,
    // Erro devolvido por `get_contact_by_id`
    pub contact_error: Option<fn() -> ClientError>,
    pub initialized: Arc<AtomicUsize>,
    pub destroyed: Arc<AtomicUsize>,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            contacts: HashMap::new(),
            chats: HashMap::new(),
            participants: HashMap::new(),
            init_delay: Duration::from_secs(1),
            init_error: None,
            labels_error: None,
            contact_error: None,
            initialized: Arc::new(AtomicUsize::new(0)),
            destroyed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeClient {
    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.insert(contact.id.clone(), contact);
        self
    }

    pub fn with_chat(mut self, chat: Chat) -> Self {
        self.chats.insert(chat.id.clone(), chat);
        self
    }

    pub fn with_label(mut self, id: &str, name: &str) -> Self {
        self.labels.push(Label { id: id.into(), name: name.into(), hex_color: None });
        self
    }
}

#[async_trait]
impl WhatsAppClient for FakeClient {
    async fn initialize(&self) -> Result<(), ClientError> {
        tokio::time::sleep(self.init_delay).await;
        self.initialized.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(message) => Err(ClientError::Initialization(message.clone())),
            None => Ok(()),
        }
    }

    async fn destroy(&self) -> Result<(), ClientError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_labels(&self) -> Result<Vec<Label>, ClientError> {
        match &self.labels_error {
            Some(message) => Err(ClientError::Protocol(message.clone())),
            None => Ok(self.labels.clone()),
        }
    }

    async fn get_contact_by_id(&self, contact_id: &str) -> Result<Option<Contact>, ClientError> {
        if let Some(error) = self.contact_error {
            return Err(error());
        }
        Ok(self.contacts.get(contact_id).cloned())
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>, ClientError> {
        Ok(self.chats.get(chat_id).cloned())
    }

    async fn get_group_participants(&self, chat_id: &str) -> Result<Vec<String>, ClientError> {
        Ok(self.participants.get(chat_id).cloned().unwrap_or_default())
    }
}

pub struct FakeFactory {
    template: FakeClient,
    created: AtomicUsize,
    sinks: Mutex<Vec<EventSink>>,
}

impl FakeFactory {
    pub fn new(template: FakeClient) -> Self {
        Self { template, created: AtomicUsize::new(0), sinks: Mutex::new(Vec::new()) }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn initialized(&self) -> usize {
        self.template.initialized.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.template.destroyed.load(Ordering::SeqCst)
    }

    /// Emite pelo canal da instância mais recente.
    pub fn emit(&self, event: ClientEvent) {
        let sinks = self.sinks.lock().unwrap();
        if let Some(sink) = sinks.last() {
            let _ = sink.send(event);
        }
    }

    /// Emite pelo canal de uma instância específica (0 = primeira).
    pub fn emit_on(&self, index: usize, event: ClientEvent) {
        let sinks = self.sinks.lock().unwrap();
        if let Some(sink) = sinks.get(index) {
            let _ = sink.send(event);
        }
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create(&self, events: EventSink) -> Result<Arc<dyn WhatsAppClient>, ClientError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push(events);
        Ok(Arc::new(self.template.clone()))
    }
}

/// Supervisor com o cliente falso já pronto (sessão autenticada).
pub async fn ready_supervisor(
    client: FakeClient,
) -> (
    Arc<FakeFactory>,
    Arc<super::ConnectionSupervisor>,
    tokio::sync::mpsc::UnboundedReceiver<ClientEvent>,
) {
    let client = FakeClient { init_delay: Duration::ZERO, ..client };
    let factory = Arc::new(FakeFactory::new(client));
    let (supervisor, rx) = super::ConnectionSupervisor::new(factory.clone(), super::RetryPolicy::default());
    supervisor.start();

    wait_until(|| factory.initialized() > 0).await;
    factory.emit(ClientEvent::Ready);
    wait_until(|| supervisor.is_ready()).await;

    (factory, supervisor, rx)
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condição não satisfeita a tempo");
}

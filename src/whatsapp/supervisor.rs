// src/whatsapp/supervisor.rs

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::{
    runtime::Handle,
    sync::mpsc,
    task::JoinHandle,
};

use super::{
    client::{is_target_closed_message, ClientError, ClientFactory, WhatsAppClient},
    qr,
};
use crate::models::whatsapp::{ClientEvent, CommandOutcome, ConnectionState, ConnectionStatus};

// =============================================================================
//  POLÍTICA DE RETENTATIVA
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub auth_failure_delay: Duration,
    pub disconnect_delay: Duration,
    pub error_delay: Duration,
    pub init_failure_delay: Duration,
    pub init_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            auth_failure_delay: Duration::from_secs(5),
            disconnect_delay: Duration::from_secs(5),
            error_delay: Duration::from_secs(10),
            init_failure_delay: Duration::from_secs(15),
            init_timeout: Duration::from_secs(60),
        }
    }
}

// Reinicializar reaproveita a instância; recriar destrói e monta outra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Reinitialize,
    Recreate,
}

// =============================================================================
//  SUPERVISOR
// =============================================================================

struct Inner {
    status: ConnectionStatus,
    client: Option<Arc<dyn WhatsAppClient>>,
    // Cada instância criada ganha uma geração; eventos de gerações antigas são descartados
    generation: u64,
    // Identifica a tentativa de conexão em andamento
    attempt: u64,
    listener: Option<JoinHandle<()>>,
    retry_pending: bool,
    shut_down: bool,
}

/// Dono do ciclo de vida do cliente WhatsApp e do status exposto pela API.
///
/// No máximo uma tentativa de conexão fica em andamento; pedidos manuais
/// durante uma tentativa recebem `CommandOutcome::busy()`. Falhas agendam uma
/// única retentativa, mesmo que cheguem vários eventos de falha seguidos.
pub struct ConnectionSupervisor {
    factory: Arc<dyn ClientFactory>,
    policy: RetryPolicy,
    inner: Mutex<Inner>,
    domain_events: mpsc::UnboundedSender<ClientEvent>,
    runtime: Handle,
}

impl ConnectionSupervisor {
    /// Precisa ser chamado dentro do runtime do tokio.
    ///
    /// O receiver devolvido recebe os eventos de domínio (mensagens, contatos, grupos).
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        policy: RetryPolicy,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ClientEvent>) {
        let (domain_events, domain_rx) = mpsc::unbounded_channel();
        let supervisor = Arc::new(Self {
            factory,
            policy,
            inner: Mutex::new(Inner {
                status: ConnectionStatus::default(),
                client: None,
                generation: 0,
                attempt: 0,
                listener: None,
                retry_pending: false,
                shut_down: false,
            }),
            domain_events,
            runtime: Handle::current(),
        });
        (supervisor, domain_rx)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.lock().status.ready
    }

    /// A instância atual, somente se a sessão já estiver pronta.
    pub fn ready_client(&self) -> Option<Arc<dyn WhatsAppClient>> {
        let inner = self.lock();
        if inner.status.ready { inner.client.clone() } else { None }
    }

    /// Executa uma operação no cliente pronto. Cliente indisponível ou erro
    /// viram `fallback`; "Target closed" ainda dispara a recriação.
    pub async fn safe_operation<T, F, Fut>(self: &Arc<Self>, label: &str, fallback: T, op: F) -> T
    where
        F: FnOnce(Arc<dyn WhatsAppClient>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let Some(client) = self.ready_client() else {
            tracing::debug!("⚠️ {}: cliente não está pronto", label);
            return fallback;
        };

        match op(client).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("⚠️ {} falhou: {}", label, e);
                if e.is_target_closed() {
                    self.report_fault(&e.to_string());
                }
                fallback
            }
        }
    }

    // =========================================================================
    //  COMANDOS
    // =========================================================================

    pub fn start(self: &Arc<Self>) -> CommandOutcome {
        self.launch(Recovery::Recreate, "Conexão iniciada")
    }

    pub fn request_reconnect(self: &Arc<Self>) -> CommandOutcome {
        self.launch(Recovery::Reinitialize, "Reconexão iniciada")
    }

    pub fn request_recreate(self: &Arc<Self>) -> CommandOutcome {
        self.launch(Recovery::Recreate, "Recriação do cliente iniciada")
    }

    /// Solta os listeners, encerra a sessão e impede novas tentativas.
    pub async fn shutdown(&self) {
        let (client, listener) = {
            let mut inner = self.lock();
            inner.shut_down = true;
            inner.generation += 1;
            inner.attempt += 1;
            inner.status.ready = false;
            inner.status.connecting = false;
            inner.status.qr_code = None;
            inner.status.state = ConnectionState::Uninitialized;
            (inner.client.take(), inner.listener.take())
        };
        Self::teardown(client, listener).await;
        tracing::info!("🛑 Cliente WhatsApp encerrado");
    }

    /// Falha vinda de fora do cliente (panic, erro em task). Só "Target closed"
    /// leva à recriação; o resto é apenas registrado.
    ///
    /// Não toca no lock aqui: o panic hook pode chamar isto numa thread que
    /// já segura `inner`. A recuperação é agendada numa task.
    pub fn report_fault(self: &Arc<Self>, message: &str) {
        if !is_target_closed_message(message) {
            tracing::error!("❌ Falha não tratada: {}", message);
            return;
        }

        tracing::error!("💥 Navegador fechado, recriando cliente: {}", message);
        let this = Arc::clone(self);
        let message = message.to_string();
        self.runtime.spawn(async move {
            let mut inner = this.lock();
            this.schedule_recovery(&mut inner, this.policy.error_delay, Recovery::Recreate, message);
        });
    }

    fn launch(self: &Arc<Self>, recovery: Recovery, message: &str) -> CommandOutcome {
        match self.begin_attempt() {
            Some(attempt) => {
                let this = Arc::clone(self);
                self.runtime.spawn(async move { this.run_attempt(attempt, recovery).await });
                CommandOutcome::accepted(message)
            }
            None => {
                tracing::info!("⏳ Pedido ignorado: conexão já em andamento");
                CommandOutcome::busy()
            }
        }
    }

    // =========================================================================
    //  TENTATIVAS DE CONEXÃO
    // =========================================================================

    fn begin_attempt(&self) -> Option<u64> {
        let mut inner = self.lock();
        if inner.status.connecting || inner.shut_down {
            return None;
        }
        inner.attempt += 1;
        inner.status.connecting = true;
        inner.status.ready = false;
        inner.status.state = ConnectionState::Connecting;
        Some(inner.attempt)
    }

    async fn run_attempt(self: Arc<Self>, attempt: u64, recovery: Recovery) {
        let existing = match recovery {
            Recovery::Reinitialize => self.lock().client.clone(),
            Recovery::Recreate => None,
        };
        let client = match existing {
            Some(client) => client,
            None => match self.recreate_client(attempt).await {
                Some(client) => client,
                None => return,
            },
        };

        tracing::info!("🔄 Inicializando cliente WhatsApp (tentativa {})", attempt);
        let result = match tokio::time::timeout(self.policy.init_timeout, client.initialize()).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Initialization(format!(
                "tempo limite de {}s excedido",
                self.policy.init_timeout.as_secs()
            ))),
        };

        match result {
            Ok(()) => self.finish_attempt(attempt),
            Err(e) => self.fail_attempt(attempt, e),
        }
    }

    // Destrói a instância antiga (listeners primeiro) e monta uma nova
    async fn recreate_client(self: &Arc<Self>, attempt: u64) -> Option<Arc<dyn WhatsAppClient>> {
        let (old_client, old_listener, generation) = {
            let mut inner = self.lock();
            inner.generation += 1;
            (inner.client.take(), inner.listener.take(), inner.generation)
        };
        Self::teardown(old_client, old_listener).await;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = match self.factory.create(events_tx).await {
            Ok(client) => client,
            Err(e) => {
                self.fail_attempt(attempt, e);
                return None;
            }
        };

        let listener = self.runtime.spawn(Self::pump(Arc::downgrade(self), generation, events_rx));
        let attached = {
            let mut inner = self.lock();
            if inner.shut_down || inner.generation != generation {
                false
            } else {
                inner.client = Some(Arc::clone(&client));
                inner.listener = Some(listener);
                true
            }
        };

        if !attached {
            // Encerrado enquanto a instância era criada
            if let Err(e) = client.destroy().await {
                tracing::warn!("⚠️ Erro ao destruir cliente descartado: {}", e);
            }
            return None;
        }

        tracing::info!("🆕 Cliente WhatsApp criado (geração {})", generation);
        Some(client)
    }

    async fn teardown(client: Option<Arc<dyn WhatsAppClient>>, listener: Option<JoinHandle<()>>) {
        if let Some(listener) = listener {
            listener.abort();
        }
        if let Some(client) = client {
            if let Err(e) = client.destroy().await {
                tracing::warn!("⚠️ Erro ao destruir cliente antigo: {}", e);
            }
        }
    }

    fn finish_attempt(&self, attempt: u64) {
        let mut inner = self.lock();
        if inner.attempt != attempt {
            return;
        }
        inner.status.connecting = false;
        if !inner.status.ready {
            tracing::info!("⌛ Cliente inicializado, aguardando autenticação");
        }
    }

    fn fail_attempt(self: &Arc<Self>, attempt: u64, error: ClientError) {
        tracing::error!("❌ Falha ao inicializar cliente WhatsApp: {}", error);
        let mut inner = self.lock();
        if inner.attempt != attempt {
            return;
        }
        inner.status.connecting = false;
        self.schedule_recovery(&mut inner, self.policy.init_failure_delay, Recovery::Recreate, error.to_string());
    }

    // Marca a falha e arma uma única retentativa
    fn schedule_recovery(self: &Arc<Self>, inner: &mut Inner, delay: Duration, recovery: Recovery, message: String) {
        inner.status.ready = false;
        inner.status.last_error = Some(message);
        inner.status.state = ConnectionState::Failed;

        if inner.shut_down {
            return;
        }
        if inner.retry_pending {
            tracing::debug!("Retentativa já agendada, ignorando nova falha");
            return;
        }

        // Uma tentativa em andamento perde a validade
        if inner.status.connecting {
            inner.status.connecting = false;
            inner.attempt += 1;
        }

        inner.retry_pending = true;
        tracing::warn!("🔁 Nova tentativa ({:?}) em {}s", recovery, delay.as_secs());

        let this = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.run_scheduled_retry(recovery).await;
        });
    }

    async fn run_scheduled_retry(self: Arc<Self>, recovery: Recovery) {
        self.lock().retry_pending = false;
        match self.begin_attempt() {
            Some(attempt) => self.run_attempt(attempt, recovery).await,
            None => tracing::info!("⏭️ Retentativa descartada: conexão já em andamento"),
        }
    }

    // =========================================================================
    //  EVENTOS DO CLIENTE
    // =========================================================================

    // Listener de uma geração; abortado quando a instância é destruída
    async fn pump(supervisor: Weak<Self>, generation: u64, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
        while let Some(event) = events.recv().await {
            let Some(supervisor) = supervisor.upgrade() else { break };
            supervisor.handle_event(generation, event);
        }
    }

    pub(crate) fn handle_event(self: &Arc<Self>, generation: u64, event: ClientEvent) {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("Evento de instância antiga descartado: {:?}", event);
            return;
        }

        match event {
            ClientEvent::Qr { code } => {
                tracing::info!("📱 Novo QR Code gerado");
                if let Some(rendered) = qr::render_terminal(&code) {
                    tracing::info!("\n{}", rendered);
                }
                inner.status.qr_code = Some(code);
                inner.status.ready = false;
                if inner.status.state != ConnectionState::Failed {
                    inner.status.state = ConnectionState::Connecting;
                }
            }
            ClientEvent::Ready => {
                tracing::info!("✅ Cliente WhatsApp pronto");
                inner.status.ready = true;
                inner.status.qr_code = None;
                inner.status.last_error = None;
                inner.status.state = ConnectionState::Ready;
            }
            ClientEvent::AuthFailure { message } => {
                tracing::error!("🔒 Falha na autenticação: {}", message);
                self.schedule_recovery(&mut inner, self.policy.auth_failure_delay, Recovery::Recreate, message);
            }
            ClientEvent::Disconnected { reason } => {
                tracing::warn!("🔌 Cliente desconectado: {}", reason);
                self.schedule_recovery(&mut inner, self.policy.disconnect_delay, Recovery::Recreate, reason);
            }
            ClientEvent::Error { message } => {
                tracing::error!("❌ Erro no cliente WhatsApp: {}", message);
                let recovery = if is_target_closed_message(&message) {
                    Recovery::Recreate
                } else {
                    Recovery::Reinitialize
                };
                self.schedule_recovery(&mut inner, self.policy.error_delay, recovery, message);
            }
            domain_event => {
                drop(inner);
                if self.domain_events.send(domain_event).is_err() {
                    tracing::warn!("⚠️ Nenhum consumidor para eventos de mensagem");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::whatsapp::InboundMessage,
        whatsapp::testing::{FakeClient, FakeFactory},
    };

    fn supervisor_with(factory: Arc<FakeFactory>) -> (Arc<ConnectionSupervisor>, mpsc::UnboundedReceiver<ClientEvent>) {
        ConnectionSupervisor::new(factory, RetryPolicy::default())
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn connected() -> (Arc<FakeFactory>, Arc<ConnectionSupervisor>, mpsc::UnboundedReceiver<ClientEvent>) {
        let factory = Arc::new(FakeFactory::new(FakeClient::default()));
        let (supervisor, rx) = supervisor_with(factory.clone());
        assert!(supervisor.start().success);
        advance(Duration::from_secs(2)).await;
        factory.emit(ClientEvent::Ready);
        advance(Duration::from_millis(10)).await;
        (factory, supervisor, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn start_creates_client_and_becomes_ready() {
        let factory = Arc::new(FakeFactory::new(FakeClient::default()));
        let (supervisor, _rx) = supervisor_with(factory.clone());
        assert_eq!(supervisor.status().state, ConnectionState::Uninitialized);

        supervisor.start();
        advance(Duration::from_millis(10)).await;
        let status = supervisor.status();
        assert!(status.connecting);
        assert_eq!(status.state, ConnectionState::Connecting);

        advance(Duration::from_secs(2)).await;
        factory.emit(ClientEvent::Qr { code: "2@abc".into() });
        advance(Duration::from_millis(10)).await;
        let status = supervisor.status();
        assert!(!status.connecting);
        assert_eq!(status.qr_code.as_deref(), Some("2@abc"));
        assert!(supervisor.ready_client().is_none());

        factory.emit(ClientEvent::Ready);
        advance(Duration::from_millis(10)).await;
        let status = supervisor.status();
        assert!(status.ready);
        assert_eq!(status.qr_code, None);
        assert_eq!(status.state, ConnectionState::Ready);
        assert!(supervisor.ready_client().is_some());
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_auth_failures_schedule_one_recreate() {
        let (factory, supervisor, _rx) = connected().await;

        factory.emit(ClientEvent::AuthFailure { message: "sessão inválida".into() });
        factory.emit(ClientEvent::AuthFailure { message: "sessão inválida".into() });
        advance(Duration::from_millis(10)).await;

        let status = supervisor.status();
        assert!(!status.ready);
        assert!(!status.connecting);
        assert_eq!(status.state, ConnectionState::Failed);
        assert_eq!(status.last_error.as_deref(), Some("sessão inválida"));

        advance(Duration::from_secs(4)).await;
        assert_eq!(factory.created(), 1);

        advance(Duration::from_millis(1500)).await;
        assert!(supervisor.status().connecting);
        assert_eq!(factory.created(), 2);
        assert_eq!(factory.destroyed(), 1);

        advance(Duration::from_secs(30)).await;
        assert_eq!(factory.created(), 2);
        assert!(!supervisor.status().connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_commands_rejected_while_connecting() {
        let factory = Arc::new(FakeFactory::new(FakeClient::default()));
        let (supervisor, _rx) = supervisor_with(factory.clone());

        assert!(supervisor.start().success);
        assert!(!supervisor.request_reconnect().success);
        assert!(!supervisor.request_recreate().success);

        advance(Duration::from_secs(2)).await;
        assert!(supervisor.request_reconnect().success);
        advance(Duration::from_secs(2)).await;
        // Reconectar reaproveita a mesma instância
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.initialized(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn events_from_replaced_instance_are_ignored() {
        let (factory, supervisor, _rx) = connected().await;

        assert!(supervisor.request_recreate().success);
        advance(Duration::from_secs(2)).await;
        factory.emit(ClientEvent::Ready);
        advance(Duration::from_millis(10)).await;
        assert_eq!(factory.created(), 2);

        factory.emit_on(0, ClientEvent::Disconnected { reason: "antigo".into() });
        advance(Duration::from_millis(10)).await;
        assert!(supervisor.status().ready);
        assert_eq!(supervisor.status().last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn target_closed_error_recreates_generic_error_reinitializes() {
        let (factory, supervisor, _rx) = connected().await;

        factory.emit(ClientEvent::Error { message: "falha qualquer".into() });
        advance(Duration::from_secs(12)).await;
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.initialized(), 2);

        factory.emit(ClientEvent::Error { message: "Protocol error: Target closed.".into() });
        advance(Duration::from_secs(12)).await;
        assert_eq!(factory.created(), 2);
        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::Connecting);
        assert!(status.last_error.unwrap().contains("Target closed"));
    }

    #[tokio::test(start_paused = true)]
    async fn initialization_timeout_fails_and_recreates() {
        let slow = FakeClient { init_delay: Duration::from_secs(120), ..FakeClient::default() };
        let factory = Arc::new(FakeFactory::new(slow));
        let (supervisor, _rx) = supervisor_with(factory.clone());

        supervisor.start();
        advance(Duration::from_secs(61)).await;
        let status = supervisor.status();
        assert!(!status.connecting);
        assert_eq!(status.state, ConnectionState::Failed);
        assert!(status.last_error.unwrap().contains("tempo limite"));

        advance(Duration::from_secs(15)).await;
        assert_eq!(factory.created(), 2);
        assert!(supervisor.status().connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_initialization_is_retried() {
        let broken = FakeClient { init_error: Some("chromium não encontrado".into()), ..FakeClient::default() };
        let factory = Arc::new(FakeFactory::new(broken));
        let (supervisor, _rx) = supervisor_with(factory.clone());

        supervisor.start();
        advance(Duration::from_secs(2)).await;
        assert_eq!(supervisor.status().state, ConnectionState::Failed);
        assert_eq!(factory.created(), 1);

        advance(Duration::from_secs(15)).await;
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn domain_events_are_forwarded() {
        let (factory, _supervisor, mut rx) = connected().await;
        let message = ClientEvent::Message(InboundMessage {
            from: "5511999@c.us".into(),
            body: "oi".into(),
            is_group: false,
        });

        factory.emit(message.clone());

        assert_eq!(rx.recv().await, Some(message));
    }

    #[tokio::test(start_paused = true)]
    async fn safe_operation_falls_back_when_not_ready() {
        let factory = Arc::new(FakeFactory::new(FakeClient::default()));
        let (supervisor, _rx) = supervisor_with(factory);

        let labels = supervisor
            .safe_operation("labels", Vec::new(), |client| async move { client.get_labels().await })
            .await;

        assert!(labels.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_while_connecting_arm_a_single_retry() {
        let slow = FakeClient { init_delay: Duration::from_secs(30), ..FakeClient::default() };
        let factory = Arc::new(FakeFactory::new(slow));
        let (supervisor, _rx) = supervisor_with(factory.clone());

        supervisor.start();
        advance(Duration::from_millis(10)).await;
        assert!(supervisor.status().connecting);
        assert_eq!(factory.created(), 1);

        factory.emit(ClientEvent::AuthFailure { message: "sessão inválida".into() });
        factory.emit(ClientEvent::AuthFailure { message: "sessão inválida".into() });
        advance(Duration::from_millis(10)).await;
        let status = supervisor.status();
        assert!(!status.ready);
        assert!(!status.connecting);
        assert_eq!(status.state, ConnectionState::Failed);

        advance(Duration::from_millis(5100)).await;
        assert_eq!(factory.created(), 2);
        assert!(supervisor.status().connecting);

        // A inicialização antiga termina depois, mas já perdeu a validade
        advance(Duration::from_secs(60)).await;
        assert_eq!(factory.created(), 2);
        assert!(!supervisor.status().connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn fault_reported_while_lock_is_held_does_not_block() {
        let (factory, supervisor, _rx) = connected().await;

        {
            let _inner = supervisor.lock();
            supervisor.report_fault("Protocol error: Target closed.");
        }
        advance(Duration::from_millis(10)).await;
        let status = supervisor.status();
        assert!(!status.ready);
        assert_eq!(status.state, ConnectionState::Failed);

        advance(Duration::from_secs(10)).await;
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_destroys_client_and_blocks_retries() {
        let (factory, supervisor, _rx) = connected().await;

        supervisor.shutdown().await;
        factory.emit(ClientEvent::Disconnected { reason: "fim".into() });
        advance(Duration::from_secs(30)).await;

        assert_eq!(factory.destroyed(), 1);
        assert_eq!(factory.created(), 1);
        assert!(!supervisor.start().success);
    }
}

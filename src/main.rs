// src/main.rs

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod whatsapp;

use crate::{config::AppState, whatsapp::ConnectionSupervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let (app_state, domain_events) = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    install_panic_hook(Arc::clone(&app_state.supervisor));

    // Um único consumidor processa mensagens, contatos e grupos em ordem de chegada
    tokio::spawn(app_state.message_handler().run(domain_events));

    app_state.supervisor.start();

    let supervisor = Arc::clone(&app_state.supervisor);
    let addr = format!("0.0.0.0:{}", app_state.settings.port);
    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📚 Documentação em http://{}/swagger-ui", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erro no servidor Axum")?;

    supervisor.shutdown().await;
    tracing::info!("👋 Servidor encerrado");
    Ok(())
}

// Panics não derrubam o processo; "Target closed" ainda recria o cliente
fn install_panic_hook(supervisor: Arc<ConnectionSupervisor>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| info.to_string());
        supervisor.report_fault(&message);
        default_hook(info);
    }));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Falha ao escutar o sinal de encerramento: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Sinal de encerramento recebido");
}

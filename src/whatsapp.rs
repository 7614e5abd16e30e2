pub mod client;
pub use client::{ClientError, ClientFactory, WhatsAppClient};
pub mod gateway;
pub use gateway::{GatewayConfig, GatewayFactory, WebhookHub};
pub mod qr;
pub mod supervisor;
pub use supervisor::{ConnectionSupervisor, RetryPolicy};

#[cfg(test)]
pub mod testing;

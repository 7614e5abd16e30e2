pub mod lead_service;
pub use lead_service::LeadService;
pub mod message_handler;
pub use message_handler::MessageHandler;
pub mod metrics_service;
pub mod product_matcher;
pub mod tag_service;
pub use tag_service::TagService;

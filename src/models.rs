pub mod lead;
pub mod metrics;
pub mod product;
pub mod whatsapp;

pub mod analytics;
pub mod leads;
pub mod pages;
pub mod webhook;
pub mod whatsapp;

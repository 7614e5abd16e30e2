pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;

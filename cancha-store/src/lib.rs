pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod pg_repo;

pub use database::DbClient;
pub use memory_repo::InMemoryReservationStore;
pub use pg_repo::PgReservationStore;

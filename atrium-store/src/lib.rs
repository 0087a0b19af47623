pub mod app_config;
pub mod database;
pub mod memory;
pub mod pg;

pub use database::Database;
pub use memory::MemoryStore;
pub use pg::PgStore;

pub mod memory;
pub mod postgres;
pub mod record;
pub mod repository;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;
pub use repository::{Repository, RepositoryError};

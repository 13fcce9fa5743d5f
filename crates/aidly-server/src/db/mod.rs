pub mod models;
pub mod pool;
pub mod repository;

pub use models::*;
pub use pool::{new_pool, DbPool};
pub use repository::Repository;

pub mod accounts;
pub mod error;
pub mod pool;
pub mod sqlite;

pub use error::DatabaseError;
pub use pool::Database;
pub use sqlite::*;

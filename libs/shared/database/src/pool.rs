use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::sqlite::{open_database, open_memory_database};
use crate::DatabaseError;

/// Shared handle to the single SQLite connection.
///
/// Every request runs its work inside [`Database::transaction`]: the closure
/// gets a `BEGIN IMMEDIATE` transaction, which is committed when the closure
/// returns `Ok` and rolled back otherwise. Writers are serialized by the
/// connection mutex, so a check followed by a write inside one closure is
/// atomic with respect to other requests.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens `sqlite://path`, a bare path, or `:memory:`.
    pub fn connect(url: &str) -> Result<Self, DatabaseError> {
        let target = url.strip_prefix("sqlite://").unwrap_or(url);
        let conn = if target == ":memory:" {
            open_memory_database()?
        } else {
            open_database(Path::new(target))?
        };
        debug!("Opened database at {}", target);
        Ok(Self::from_connection(conn))
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        Self::connect(&config.database_url)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `work` in one transaction on the blocking pool.
    pub async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DatabaseError> + Send + 'static,
    {
        let db = self.clone();
        match tokio::task::spawn_blocking(move || db.transaction_blocking(work)).await {
            Ok(result) => result,
            Err(e) => {
                error!("Database task panicked or was cancelled: {}", e);
                Err(DatabaseError::TaskFailed(e.to_string()).into())
            }
        }
    }

    /// Synchronous form of [`Database::transaction`], for startup and tests.
    pub fn transaction_blocking<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let mut guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;

        // Dropping `tx` on the error path rolls it back.
        let value = work(&tx)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(value)
    }
}

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use shared_config::AppConfig;
use shared_database::Database;

/// State handed to every router: configuration and the database handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    /// The calendar date bookings are checked against.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

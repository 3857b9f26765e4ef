use rusqlite::Connection;
use tracing::debug;

use doctor_cell::models::DoctorSearchFilters;
use doctor_cell::services::DoctorService;
use patient_cell::models::{PatientSearchQuery, PatientView};
use patient_cell::services::PatientService;

use crate::models::{AdminError, SearchQuery, SearchResults, SearchType};

pub struct AdminSearchService<'a> {
    conn: &'a Connection,
}

impl<'a> AdminSearchService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Doctors match on name or department, patients on name, email,
    /// contact or id. A blank query finds nothing.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, AdminError> {
        let term = match query.q.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => term.to_string(),
            _ => return Ok(SearchResults::default()),
        };
        debug!("Admin search for '{}' ({:?})", term, query.search_type);

        let mut results = SearchResults::default();
        if matches!(query.search_type, SearchType::All | SearchType::Doctors) {
            results.doctors = DoctorService::new(self.conn).list_doctors(&DoctorSearchFilters {
                department_id: None,
                query: Some(term.clone()),
                include_inactive: true,
            })?;
        }
        if matches!(query.search_type, SearchType::All | SearchType::Patients) {
            results.patients = PatientService::new(self.conn)
                .list_patients(&PatientSearchQuery {
                    query: Some(term),
                    include_inactive: true,
                })?
                .into_iter()
                .map(PatientView::from)
                .collect();
        }
        Ok(results)
    }
}

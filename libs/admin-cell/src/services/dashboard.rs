use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::debug;

use appointment_cell::models::{AppointmentFilter, AppointmentStatus, AppointmentView};
use appointment_cell::services::records;
use shared_database::accounts;
use shared_models::auth::Role;

use crate::models::{AdminDashboard, AdminError, AdminStats};

const DASHBOARD_LIST_LIMIT: u32 = 10;

pub struct AdminDashboardService<'a> {
    conn: &'a Connection,
}

impl<'a> AdminDashboardService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<AdminDashboard, AdminError> {
        let everything = AppointmentFilter {
            today: Some(today),
            limit: Some(DASHBOARD_LIST_LIMIT),
            ..AppointmentFilter::default()
        };
        let upcoming = AppointmentFilter {
            status: Some(AppointmentStatus::Booked),
            view: AppointmentView::Upcoming,
            ..everything.clone()
        };

        let total_departments: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM departments", [], |row| row.get(0))?;

        let stats = AdminStats {
            total_doctors: accounts::count_accounts_by_role(self.conn, Role::Doctor)?,
            total_patients: accounts::count_accounts_by_role(self.conn, Role::Patient)?,
            total_departments,
            total_appointments: records::count_appointments(self.conn, &everything)?,
            upcoming_appointments: records::count_appointments(self.conn, &upcoming)?,
        };
        debug!("Admin dashboard stats: {:?}", stats);

        Ok(AdminDashboard {
            stats,
            recent_appointments: records::list_details(self.conn, &everything)?,
            upcoming_appointments: records::list_details(self.conn, &upcoming)?,
        })
    }
}

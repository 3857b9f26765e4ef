use tracing::{debug, info};

use doctor_cell::models::{CreateDepartmentRequest, DoctorError};
use doctor_cell::services::DepartmentService;
use shared_config::AppConfig;
use shared_database::accounts::{self, NewAccount};
use shared_database::Database;
use shared_models::auth::Role;
use shared_utils::password::PasswordService;

const DEFAULT_DEPARTMENTS: [(&str, &str); 3] = [
    ("Cardiology", "Heart and blood vessel care"),
    ("Orthopedics", "Bones, joints and muscles"),
    ("Dermatology", "Skin, hair and nails"),
];

/// First start only: create the configured admin and the default
/// departments. Returns whether anything was written.
pub fn seed_defaults(db: &Database, config: &AppConfig) -> anyhow::Result<bool> {
    let email = config.admin_email.clone();
    let password = config.admin_password.clone();

    let seeded = db.transaction_blocking(move |tx| -> Result<bool, DoctorError> {
        if accounts::count_accounts_by_role(tx, Role::Admin)? > 0 {
            debug!("Admin account present, skipping seed");
            return Ok(false);
        }

        let admin = accounts::insert_account(
            tx,
            NewAccount {
                name: "Administrator".to_string(),
                email,
                password_hash: PasswordService::hash_password(&password)?,
                role: Role::Admin,
                contact: None,
            },
        )?;
        info!("Seeded admin account {}", admin.email);

        let departments = DepartmentService::new(tx);
        for (name, description) in DEFAULT_DEPARTMENTS {
            if departments.find_by_name(name)?.is_none() {
                departments.create_department(CreateDepartmentRequest {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                })?;
            }
        }
        Ok(true)
    })?;

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    fn count(db: &Database, sql: &str) -> i64 {
        db.transaction_blocking(|tx| {
            tx.query_row(sql, [], |row| row.get(0))
                .map_err(shared_database::DatabaseError::from)
        })
        .unwrap()
    }

    #[test]
    fn test_seed_runs_once() {
        let db = Database::open_in_memory().unwrap();
        let config = TestConfig::default().to_app_config();

        assert!(seed_defaults(&db, &config).unwrap());
        assert!(!seed_defaults(&db, &config).unwrap());

        assert_eq!(count(&db, "SELECT COUNT(*) FROM users WHERE role = 'admin'"), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM departments"), 3);
    }

    #[test]
    fn test_seeded_admin_can_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let config = TestConfig::default().to_app_config();
        seed_defaults(&db, &config).unwrap();

        let admin = db
            .transaction_blocking(|tx| accounts::find_account_by_email(tx, "ADMIN@hms.com"))
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(PasswordService::verify_password("admin123", &admin.password_hash).unwrap());
    }
}

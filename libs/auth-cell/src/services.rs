use rusqlite::Connection;
use tracing::{info, instrument, warn};

use doctor_cell::services::DoctorService;
use patient_cell::models::PatientView;
use patient_cell::services::PatientService;
use shared_database::accounts;
use shared_models::auth::{Principal, Role, UserAccount};
use shared_utils::password::PasswordService;
use shared_utils::validation::is_valid_email;

use crate::models::{AccountProfile, AuthError, CurrentAccount, RegisterRequest};

pub struct AuthService<'a> {
    conn: &'a Connection,
}

impl<'a> AuthService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Check credentials. Unknown email and wrong password fail alike.
    #[instrument(skip(self, password))]
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserAccount, AuthError> {
        let account = accounts::find_account_by_email(self.conn, email)?.ok_or_else(|| {
            warn!("Login attempt for unknown email");
            AuthError::InvalidCredentials
        })?;

        if !PasswordService::verify_password(password, &account.password_hash)? {
            warn!("Wrong password for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }
        if !account.is_active {
            warn!("Deactivated account {} tried to log in", account.id);
            return Err(AuthError::AccountDisabled);
        }

        info!("{} {} logged in", account.role, account.id);
        Ok(account)
    }

    /// Self-registration always creates a patient.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub fn register(&self, request: RegisterRequest) -> Result<(UserAccount, PatientView), AuthError> {
        if !is_valid_email(&request.email) {
            return Err(AuthError::InvalidEmail);
        }

        let (account, profile) = PatientService::new(self.conn).register_patient(
            &request.name,
            &request.email,
            &request.password,
            request.contact,
        )?;
        Ok((account, PatientView::from(profile)))
    }

    pub fn current_account(&self, principal: &Principal) -> Result<CurrentAccount, AuthError> {
        let user = accounts::find_account(self.conn, principal.id)?.ok_or(AuthError::AccountNotFound)?;

        let profile = match user.role {
            Role::Admin => None,
            Role::Doctor => DoctorService::new(self.conn)
                .find_by_user(user.id)?
                .map(AccountProfile::Doctor),
            Role::Patient => PatientService::new(self.conn)
                .find_by_user(user.id)?
                .map(|patient| AccountProfile::Patient(patient.into())),
        };

        Ok(CurrentAccount {
            dashboard_path: user.role.dashboard_path(),
            user,
            profile,
        })
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use doctor_cell::models::{DoctorError, DoctorProfile};
use patient_cell::models::{PatientError, PatientView};
use shared_database::DatabaseError;
use shared_models::auth::UserAccount;
use shared_models::error::AppError;
use shared_utils::password::PasswordError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserAccount,
    pub dashboard_path: &'static str,
}

/// The profile row behind an account, if its role has one.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AccountProfile {
    Doctor(DoctorProfile),
    Patient(PatientView),
}

#[derive(Debug, Serialize)]
pub struct CurrentAccount {
    pub user: UserAccount,
    pub profile: Option<AccountProfile>,
    pub dashboard_path: &'static str,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Your account has been deactivated")]
    AccountDisabled,

    #[error("A valid email address is required")]
    InvalidEmail,

    #[error("Account not found")]
    AccountNotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::AccountDisabled => AppError::Forbidden(err.to_string()),
            AuthError::InvalidEmail => AppError::ValidationError(err.to_string()),
            AuthError::AccountNotFound => AppError::NotFound(err.to_string()),
            AuthError::Password(e) => e.into(),
            AuthError::Doctor(e) => e.into(),
            AuthError::Patient(e) => e.into(),
            AuthError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(AppError::from(AuthError::InvalidCredentials).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::AccountDisabled).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(AuthError::InvalidEmail).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(AuthError::Patient(PatientError::EmailTaken)).status_code(),
            StatusCode::CONFLICT
        );
    }
}

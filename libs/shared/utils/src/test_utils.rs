use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose, Engine as _};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use hmac::{Hmac, Mac};
use rusqlite::params;
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, Environment};
use shared_database::accounts::{self, NewAccount};
use shared_database::{timestamp_param, Database, DatabaseError};
use shared_models::auth::{Principal, Role, UserAccount};

use crate::jwt::issue_token;
use crate::password::PasswordService;
use crate::state::AppState;

/// Password every fixture account is created with.
pub const FIXTURE_PASSWORD: &str = "password123";

/// Monday to Friday, 09:00-12:00 and 14:00-17:00.
pub const DEFAULT_AVAILABILITY_JSON: &str = r#"{"monday":[{"start":"09:00","end":"12:00"},{"start":"14:00","end":"17:00"}],"tuesday":[{"start":"09:00","end":"12:00"},{"start":"14:00","end":"17:00"}],"wednesday":[{"start":"09:00","end":"12:00"},{"start":"14:00","end":"17:00"}],"thursday":[{"start":"09:00","end":"12:00"},{"start":"14:00","end":"17:00"}],"friday":[{"start":"09:00","end":"12:00"},{"start":"14:00","end":"17:00"}]}"#;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_url: ":memory:".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            secret_key: self.jwt_secret.clone(),
            database_url: self.database_url.clone(),
            environment: Environment::Development,
            port: 0,
            token_ttl_hours: 1,
            default_slot_minutes: 30,
            admin_email: "admin@hms.com".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "patient")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            role: self.role.parse().expect("TestUser role must be a known role"),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// An account together with the profile row created for it.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub account: UserAccount,
    pub profile_id: Uuid,
}

impl Seeded {
    pub fn principal(&self) -> Principal {
        self.account.principal()
    }
}

// argon2 is slow in debug builds; hash the fixture password once.
fn fixture_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        PasswordService::hash_password(FIXTURE_PASSWORD).expect("fixture password hashes")
    })
    .clone()
}

/// A fresh in-memory database plus helpers for seeding it.
pub struct TestContext {
    pub state: AppState,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("in-memory database opens");
        Self {
            state: AppState::new(TestConfig::default().to_app_config(), db),
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.state.config.clone()
    }

    fn create_account(&self, name: &str, email: &str, role: Role) -> UserAccount {
        let account = NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: fixture_password_hash(),
            role,
            contact: Some("555-0100".to_string()),
        };
        self.db()
            .transaction_blocking(|tx| accounts::insert_account(tx, account))
            .expect("fixture account inserts")
    }

    pub fn create_admin(&self, email: &str) -> UserAccount {
        self.create_account("Administrator", email, Role::Admin)
    }

    pub fn create_department(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.db()
            .transaction_blocking(|tx| {
                tx.execute(
                    "INSERT INTO departments (id, name, description, created_at) VALUES (?1, ?2, NULL, ?3)",
                    params![id.to_string(), name, timestamp_param(Utc::now())],
                )
                .map_err(DatabaseError::from)
            })
            .expect("fixture department inserts");
        id
    }

    /// A doctor with the default weekday availability.
    pub fn create_doctor(&self, name: &str, email: &str, department_id: Uuid) -> Seeded {
        let account = self.create_account(name, email, Role::Doctor);
        let profile_id = Uuid::new_v4();
        let now = timestamp_param(Utc::now());
        self.db()
            .transaction_blocking(|tx| {
                tx.execute(
                    "INSERT INTO doctor_profiles
                        (id, user_id, department_id, specialization, experience_years, availability, created_at, updated_at)
                     VALUES (?1, ?2, ?3, 'General', 5, ?4, ?5, ?5)",
                    params![
                        profile_id.to_string(),
                        account.id.to_string(),
                        department_id.to_string(),
                        DEFAULT_AVAILABILITY_JSON,
                        now,
                    ],
                )
                .map_err(DatabaseError::from)
            })
            .expect("fixture doctor profile inserts");
        Seeded { account, profile_id }
    }

    pub fn create_patient(&self, name: &str, email: &str) -> Seeded {
        let account = self.create_account(name, email, Role::Patient);
        let profile_id = Uuid::new_v4();
        let now = timestamp_param(Utc::now());
        self.db()
            .transaction_blocking(|tx| {
                tx.execute(
                    "INSERT INTO patient_profiles
                        (id, user_id, date_of_birth, gender, address, contact, created_at, updated_at)
                     VALUES (?1, ?2, '1990-05-17', 'Female', '1 Main Street', '555-0100', ?3, ?3)",
                    params![profile_id.to_string(), account.id.to_string(), now],
                )
                .map_err(DatabaseError::from)
            })
            .expect("fixture patient profile inserts");
        Seeded { account, profile_id }
    }

    pub fn deactivate(&self, account_id: Uuid) {
        self.db()
            .transaction_blocking(|tx| accounts::set_account_active(tx, account_id, false))
            .expect("fixture account deactivates");
    }

    pub fn token(&self, account: &UserAccount) -> String {
        issue_token(&account.principal(), &self.state.config.secret_key, 1)
            .expect("fixture token issues")
    }

    pub fn bearer(&self, account: &UserAccount) -> String {
        format!("Bearer {}", self.token(account))
    }

    pub fn count(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.db()
            .transaction_blocking(|tx| {
                tx.query_row(&sql, [], |row| row.get(0)).map_err(DatabaseError::from)
            })
            .expect("fixture count runs")
    }
}

/// The first `weekday` strictly after `from`.
pub fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - from.weekday().num_days_from_monday() as i64)
        % 7;
    from + Duration::days(if ahead == 0 { 7 } else { ahead })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();

        assert_eq!(config.database_url, ":memory:");
        assert!(!config.secret_key.is_empty());
        assert_eq!(config.default_slot_minutes, 30);
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        let principal = user.principal();

        assert_eq!(principal.email, "doc@example.com");
        assert_eq!(principal.role, Role::Doctor);
        assert_eq!(principal.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let token = JwtTestUtils::create_test_token(&TestUser::default(), "test-secret", Some(1));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_next_weekday_is_strictly_after() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(next_weekday(wednesday, Weekday::Mon), NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert_eq!(next_weekday(wednesday, Weekday::Wed), NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
    }

    #[test]
    fn test_context_seeds_profiles() {
        let ctx = TestContext::new();
        let department = ctx.create_department("Cardiology");
        ctx.create_doctor("Dr. A", "a@example.com", department);
        ctx.create_patient("Pat", "p@example.com");

        assert_eq!(ctx.count("users"), 2);
        assert_eq!(ctx.count("doctor_profiles"), 1);
        assert_eq!(ctx.count("patient_profiles"), 1);
    }
}

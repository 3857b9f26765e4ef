use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-in-production";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@hms.com";

/// Bounds on the appointment slot length, in minutes.
pub const MIN_SLOT_MINUTES: u32 = 5;
pub const MAX_SLOT_MINUTES: u32 = 480;
pub const DEFAULT_SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "default" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secret_key: String,
    pub database_url: String,
    pub environment: Environment,
    pub port: u16,
    pub token_ttl_hours: i64,
    pub default_slot_minutes: u32,
    pub admin_email: String,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            secret_key: env::var("SECRET_KEY")
                .unwrap_or_else(|_| {
                    warn!("SECRET_KEY not set, using development key");
                    DEFAULT_SECRET_KEY.to_string()
                }),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using sqlite://hospital.db");
                    "sqlite://hospital.db".to_string()
                }),
            environment: env::var("APP_ENV")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(environment) => Some(environment),
                    Err(e) => {
                        warn!("Ignoring APP_ENV: {}", e);
                        None
                    }
                })
                .unwrap_or(Environment::Development),
            port: parse_or_default("PORT", 5000),
            token_ttl_hours: parse_or_default("TOKEN_TTL_HOURS", 24),
            default_slot_minutes: slot_minutes_or_default(parse_or_default(
                "DEFAULT_SLOT_MINUTES",
                DEFAULT_SLOT_MINUTES,
            )),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_EMAIL not set, seeding admin as {}", DEFAULT_ADMIN_EMAIL);
                    DEFAULT_ADMIN_EMAIL.to_string()
                }),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, seeded admin uses the default password");
                    "admin123".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - SECRET_KEY must be set in production");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
            && !(self.is_production() && self.secret_key == DEFAULT_SECRET_KEY)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn slot_minutes_or_default(minutes: u32) -> u32 {
    if (MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&minutes) {
        minutes
    } else {
        warn!(
            "DEFAULT_SLOT_MINUTES must be between {} and {}, got {}, using default {}",
            MIN_SLOT_MINUTES, MAX_SLOT_MINUTES, minutes, DEFAULT_SLOT_MINUTES
        );
        DEFAULT_SLOT_MINUTES
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Minimum number of questions a quiz must keep at all times.
pub const MIN_QUESTIONS_PER_QUIZ: usize = 2;

/// Minimum number of answer variants per question.
pub const MIN_ANSWER_VARIANTS: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    /// JWT lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Optional credentials for seeding the first admin user at startup.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// How often the cooldown notifier sweeps the ledger, in seconds.
    /// The sweep is not idempotent within a day, so keep this at one
    /// run per day.
    pub notifier_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let notifier_interval_secs = env::var("NOTIFIER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24 * 3600);

        Self {
            database_url,
            redis_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            notifier_interval_secs,
        }
    }
}

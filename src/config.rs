// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Number of questions served in a daily quiz.
pub const DAILY_QUIZ_SIZE: usize = 5;

/// Upper bound on lesson rows pulled as candidates for synthesized questions.
pub const CONTENT_CANDIDATE_LIMIT: i64 = 50;

/// XP granted per correct answer.
pub const XP_PER_CORRECT: i64 = 10;

/// Bonus for a perfect quiz.
pub const PERFECT_BONUS_XP: i64 = 20;

/// Bonus for reaching `HIGH_SCORE_PERCENTAGE` without a perfect score.
pub const HIGH_SCORE_BONUS_XP: i64 = 10;
pub const HIGH_SCORE_PERCENTAGE: i64 = 80;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// JWT lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// How long a generated quiz can be submitted, in seconds.
    pub quiz_session_ttl: u64,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed_or("JWT_EXPIRATION", 86_400)?;
        let quiz_session_ttl = parsed_or("QUIZ_SESSION_TTL", 3_600)?;
        let bind_addr = parsed_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            quiz_session_ttl,
            bind_addr,
        })
    }
}

fn required(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("{} must be set", key))
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

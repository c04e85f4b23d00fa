use std::path::PathBuf;

use chrono::Duration;

use crate::utils::error::{AppError, AppResult};

const DEFAULT_DATABASE_URL: &str = "sqlite://guildhall.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MEDIA_ROOT: &str = "./media";
const DEFAULT_MEDIA_URL: &str = "/media";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub bind_addr: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let secret_key = std::env::var("SECRET_KEY")
            .map_err(|_| AppError::Internal("SECRET_KEY not set".to_string()))?;

        let token_ttl_hours = match std::env::var("TOKEN_TTL_HOURS") {
            Ok(value) => value.parse::<i64>().map_err(|e| {
                AppError::Internal(format!("Invalid TOKEN_TTL_HOURS '{}': {}", value, e))
            })?,
            Err(_) => DEFAULT_TOKEN_TTL_HOURS,
        };

        Ok(Self {
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            secret_key,
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            media_root: PathBuf::from(env_or("MEDIA_ROOT", DEFAULT_MEDIA_ROOT)),
            media_url: media_url(env_or("MEDIA_URL", DEFAULT_MEDIA_URL))?,
            token_ttl: Duration::hours(token_ttl_hours),
        })
    }

    /// Settings for tests and local tooling: in-memory database, given media root.
    pub fn for_tests(media_root: PathBuf) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            secret_key: "test-secret".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            media_root,
            media_url: DEFAULT_MEDIA_URL.to_string(),
            token_ttl: Duration::hours(1),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Media is mounted beside `/api`, so it needs a prefix of its own.
fn media_url(value: String) -> AppResult<String> {
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Err(AppError::Internal(format!(
            "Invalid MEDIA_URL '{}': media cannot be served from the site root",
            value
        )));
    }
    Ok(format!("/{}", trimmed))
}

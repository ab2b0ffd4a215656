use std::env;

use chrono::TimeDelta;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub prediction_url: String,
    pub prediction_timeout_ms: u64,
    pub event_buffer_size: usize,
    pub cors_origins: Vec<String>,
    pub slot_conflict_check: bool,
    pub slot_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let slot_minutes: i64 = parse_or_default("SLOT_MINUTES", 60)?;
        slot_window(slot_minutes)?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3001)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            prediction_url: env::var("PREDICTION_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
            prediction_timeout_ms: parse_or_default("PREDICTION_TIMEOUT_MS", 3000)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            cors_origins: parse_list(
                env::var("CORS_ORIGINS").ok().as_deref(),
                "http://localhost:3000",
            ),
            slot_conflict_check: parse_or_default("SLOT_CONFLICT_CHECK", false)?,
            slot_minutes,
        })
    }
}

impl Config {
    /// Minimum spacing between open bookings of one nurse, when the check is on.
    pub fn slot_window(&self) -> Result<Option<TimeDelta>, AppError> {
        if !self.slot_conflict_check {
            return Ok(None);
        }
        slot_window(self.slot_minutes).map(Some)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3001,
            log_level: "info".to_string(),
            prediction_url: "http://127.0.0.1:5000".to_string(),
            prediction_timeout_ms: 3000,
            event_buffer_size: 1024,
            cors_origins: vec!["http://localhost:3000".to_string()],
            slot_conflict_check: false,
            slot_minutes: 60,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn slot_window(minutes: i64) -> Result<TimeDelta, AppError> {
    if minutes <= 0 {
        return Err(AppError::Internal("invalid SLOT_MINUTES: must be > 0".to_string()));
    }
    TimeDelta::try_minutes(minutes).ok_or_else(|| {
        AppError::Internal(format!("invalid SLOT_MINUTES: {minutes} is out of range"))
    })
}

fn parse_list(raw: Option<&str>, default: &str) -> Vec<String> {
    raw.unwrap_or(default)
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

use chrono::FixedOffset;
use std::{env, str::FromStr};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    /// Browser origin of the web client allowed by CORS.
    pub cors_allowed_origin: String,

    // Attendance policy
    pub utc_offset: FixedOffset,
    pub standard_hours: f64,
    pub half_day_hours: f64,
    pub default_shift_id: u64,
    pub max_leave_days: u32,

    pub default_user_password: String,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 86_400)?, // default 24h

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            utc_offset: utc_offset_from_env("APP_UTC_OFFSET", "+07:00")?,
            standard_hours: parsed_or("STANDARD_HOURS", 8.0)?,
            half_day_hours: parsed_or("HALF_DAY_HOURS", 4.0)?,
            default_shift_id: parsed_or("DEFAULT_SHIFT_ID", 1)?,
            max_leave_days: parsed_or("MAX_LEAVE_DAYS", 366)?,

            default_user_password: env::var("DEFAULT_USER_PASSWORD")
                .unwrap_or_else(|_| "Aa!12345".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed_or("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn utc_offset_from_env(key: &'static str, default: &str) -> Result<FixedOffset, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_utc_offset(&value).ok_or(ConfigError::Invalid { key, value })
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM` or `Z` into a fixed offset.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
impl Config {
    /// Configuration for handler tests; nothing here touches the network.
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance_test".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            cors_allowed_origin: "http://localhost:5173".to_string(),
            utc_offset: FixedOffset::east_opt(7 * 3600).unwrap(),
            standard_hours: 8.0,
            half_day_hours: 4.0,
            default_shift_id: 1,
            max_leave_days: 366,
            default_user_password: "Aa!12345".to_string(),
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
        }
    }
}

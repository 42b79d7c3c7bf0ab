use log::warn;
use std::env;

/// Upper bound for token lifetimes, in minutes (one year).
const MAX_TOKEN_MINUTES: i64 = 60 * 24 * 366;
/// Upper bound for the OTP window, in seconds (one day).
const MAX_OTP_INTERVAL_SECONDS: i64 = 60 * 60 * 24;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_header: String,
    pub access_token_minutes: i64,
    pub reset_token_minutes: i64,
    pub otp_interval_seconds: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(38322);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/social.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "q7Vt3kLpZx9NbR2sWfYd".to_string());

        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "Authorization".to_string());

        Self {
            server_port,
            sqlite_path,
            database_url,
            jwt_secret,
            token_header,
            access_token_minutes: env_i64("ACCESS_TOKEN_MINUTES", 60 * 24 * 7, MAX_TOKEN_MINUTES),
            reset_token_minutes: env_i64("RESET_TOKEN_MINUTES", 15, MAX_TOKEN_MINUTES),
            otp_interval_seconds: env_i64("OTP_INTERVAL_SECONDS", 300, MAX_OTP_INTERVAL_SECONDS),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }
}

fn env_i64(key: &str, default: i64, max: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => parse_bounded(&raw, max).unwrap_or_else(|| {
            warn!("{}={} is not in 1..={}, using {}", key, raw, max, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_bounded(raw: &str, max: i64) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| (1..=max).contains(v))
}

#[cfg(test)]
impl AppConfig {
    pub fn for_test() -> Self {
        Self {
            server_port: 0,
            sqlite_path: String::new(),
            database_url: Some("sqlite::memory:".to_string()),
            jwt_secret: "test-secret".to_string(),
            token_header: "Authorization".to_string(),
            access_token_minutes: 60,
            reset_token_minutes: 15,
            otp_interval_seconds: 300,
        }
    }
}

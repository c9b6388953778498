use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ShiprocketConfig {
    pub email: String,
    pub password: String,
    pub base_url: String,
    pub pickup_location: String,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_name: Option<String>,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub bind_addr: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub razorpay: Option<RazorpayConfig>,
    pub webhook_secret: Option<String>,
    pub shiprocket: Option<ShiprocketConfig>,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("MONGO_URI")
            .or_else(|| get("DATABASE_URL"))
            .ok_or(ConfigError::Missing("MONGO_URI"))?;
        let session_secret = get("SECRET_KEY")
            .or_else(|| get("JWT_SECRET"))
            .ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let port = match get("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => 5000,
        };
        let session_ttl_hours = match get("SESSION_TTL_HOURS") {
            Some(value) => match value.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => return Err(ConfigError::Invalid { key: "SESSION_TTL_HOURS", value }),
            },
            None => 12,
        };

        let razorpay = match (get("RAZORPAY_KEY_ID"), get("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig {
                key_id,
                key_secret,
                base_url: get("RAZORPAY_BASE_URL").unwrap_or_else(|| "https://api.razorpay.com/v1".to_string()),
            }),
            _ => None,
        };

        let shiprocket = match (get("SHIPROCKET_EMAIL"), get("SHIPROCKET_PASSWORD")) {
            (Some(email), Some(password)) => Some(ShiprocketConfig {
                email,
                password,
                base_url: get("SHIPROCKET_BASE_URL")
                    .unwrap_or_else(|| "https://apiv2.shiprocket.in/v1/external".to_string()),
                pickup_location: get("SHIPROCKET_PICKUP_LOCATION").unwrap_or_else(|| "Primary".to_string()),
            }),
            _ => None,
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email: email.to_lowercase(),
                password,
                name: get("ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()),
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            database_name: get("DATABASE_NAME"),
            session_secret,
            session_ttl_hours,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "statics".to_string())),
            razorpay,
            webhook_secret: get("RAZORPAY_WEBHOOK_SECRET"),
            shiprocket,
            admin,
        })
    }
}

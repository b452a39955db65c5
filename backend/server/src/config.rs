use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::AppError;

pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub allowed_origin: String,
    pub session_ttl: Duration,
    pub admin_password: String,
    pub session_secret: String,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            store_url: try_load("STORE_URL", "memory://")?,
            allowed_origin: try_load("ALLOWED_ORIGIN", "http://localhost:3000")?,
            session_ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", "43200")?),
            admin_password: read_secret("ADMIN_PASSWORD")?,
            session_secret: read_secret("SESSION_SECRET")?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid {key} value: {e}")))
}

/// Docker secret first, then the environment.
fn read_secret(secret_name: &str) -> Result<String, AppError> {
    let path = format!("/run/secrets/{secret_name}");

    let secret = read_to_string(&path)
        .map(|s| s.trim().to_string())
        .or_else(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
            env::var(secret_name).map(|s| s.trim().to_string())
        })
        .map_err(|_| AppError::Config(format!("{secret_name} is not set")))?;

    if secret.is_empty() {
        return Err(AppError::Config(format!("{secret_name} is empty")));
    }

    Ok(secret)
}

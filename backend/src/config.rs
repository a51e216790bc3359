use anyhow::anyhow;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;

/// Minimum length accepted for the HMAC signing secret.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub device_validity_days: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/signet".to_string());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET is required"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "JWT_SECRET must be at least {} characters, got {}",
                MIN_SECRET_LEN,
                jwt_secret.len()
            ));
        }

        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "signet".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "signet-clients".to_string());

        let raw_validity = env::var("DEVICE_VALIDITY_DAYS").unwrap_or_else(|_| "90".to_string());
        let device_validity_days: u64 = raw_validity
            .parse()
            .map_err(|_| anyhow!("Invalid DEVICE_VALIDITY_DAYS value: {}", raw_validity))?;
        if device_validity_days == 0 {
            return Err(anyhow!("DEVICE_VALIDITY_DAYS must be positive"));
        }

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            device_validity_days,
        })
    }

    /// The configured device/token validity window as a chrono span.
    pub fn device_validity(&self) -> Duration {
        Duration::days(self.device_validity_days as i64)
    }
}

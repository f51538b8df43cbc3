use std::env;

use anyhow::{anyhow, bail};

const SECONDS_PER_DAY: u64 = 86_400;
/// Upper bound on either token lifetime.
const MAX_TOKEN_TTL_SECONDS: u64 = 365 * SECONDS_PER_DAY;

#[derive(Debug, Clone)]
pub struct Config {
    /// When absent the API runs on the in-process store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub jwt_expiry_seconds: u64,
    pub jwt_refresh_expiry_days: u64,
    pub bcrypt_cost: u32,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_refresh_secret: required("JWT_REFRESH_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "900".into())
                .parse()?,
            jwt_refresh_expiry_days: env::var("JWT_REFRESH_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.jwt_refresh_expiry_days.saturating_mul(SECONDS_PER_DAY)
    }

    /// Reject lifetimes and costs that would overflow or make no sense.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_expiry_seconds == 0 || self.jwt_expiry_seconds > MAX_TOKEN_TTL_SECONDS {
            bail!(
                "JWT_EXPIRY_SECONDS must be between 1 and {MAX_TOKEN_TTL_SECONDS}, got {}",
                self.jwt_expiry_seconds
            );
        }
        let refresh = self
            .jwt_refresh_expiry_days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or_else(|| anyhow!("JWT_REFRESH_EXPIRY_DAYS is out of range"))?;
        if refresh == 0 || refresh > MAX_TOKEN_TTL_SECONDS {
            bail!(
                "JWT_REFRESH_EXPIRY_DAYS must be between 1 and 365, got {}",
                self.jwt_refresh_expiry_days
            );
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", self.bcrypt_cost);
        }
        Ok(())
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Missing required env var: {}", key))
}

use std::env;

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

/// Process-wide settings resolved from the environment (after `.env` is loaded).
#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Only accept `Authorization: Bearer <token>`; the legacy second-word fallback is refused.
    pub strict_bearer: bool,
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Clone, Debug)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL env var is missing")?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET env var is missing or empty"))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let token_ttl_hours = match lookup("JWT_EXPIRES_HOURS") {
            Some(raw) => {
                let hours: i64 = raw
                    .parse()
                    .with_context(|| format!("JWT_EXPIRES_HOURS must be an integer, got {raw:?}"))?;
                if hours <= 0 {
                    return Err(anyhow!("JWT_EXPIRES_HOURS must be positive"));
                }
                hours
            }
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let strict_bearer = lookup("AUTH_STRICT_BEARER")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let seed_admin = match (lookup("SEED_ADMIN_EMAIL"), lookup("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(SeedAdmin {
                    email: email.trim().to_lowercase(),
                    password,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            token_ttl_hours,
            strict_bearer,
            seed_admin,
        })
    }
}

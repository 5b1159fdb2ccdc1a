use anyhow::{bail, Context};

use crate::analytics::MAX_WINDOW_DAYS;

/// Upper bound for `JWT_TTL_DAYS`
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub auth: AuthConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Single allowed CORS origin; any origin is allowed when unset
    pub cors_allowed_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Length in days of the current and prior comparison periods
    pub comparison_window_days: i64,
}

impl AuthConfig {
    const fn default_token_ttl_days() -> i64 {
        7
    }
}

impl DashboardConfig {
    const fn default_window_days() -> i64 {
        crate::analytics::DEFAULT_WINDOW_DAYS
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            comparison_window_days: Self::default_window_days(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./pulseboard.db?mode=rwc".to_string());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;
        let cors_allowed_origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!(
                    "JWT_SECRET is not set, using a random secret. Sessions will not survive restarts"
                );
                random_secret()
            }
        };

        let token_ttl_days = parse_days(
            "JWT_TTL_DAYS",
            std::env::var("JWT_TTL_DAYS").ok(),
            AuthConfig::default_token_ttl_days(),
            MAX_TOKEN_TTL_DAYS,
        )?;

        let comparison_window_days = parse_days(
            "COMPARISON_WINDOW_DAYS",
            std::env::var("COMPARISON_WINDOW_DAYS").ok(),
            DashboardConfig::default_window_days(),
            MAX_WINDOW_DAYS,
        )?;

        Ok(Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
                cors_allowed_origin,
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_days,
            },
            dashboard: DashboardConfig {
                comparison_window_days,
            },
        })
    }
}

/// A day count from the environment. Missing, empty or non-positive values
/// fall back to `default`; values above `max` are rejected.
fn parse_days(name: &str, raw: Option<String>, default: i64, max: i64) -> anyhow::Result<i64> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    let days = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{name} must be an integer"))?;

    if days <= 0 {
        return Ok(default);
    }
    if days > max {
        bail!("{name} must be at most {max}, got {days}");
    }
    Ok(days)
}

fn random_secret() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secrets_differ() {
        let a = random_secret();
        let b = random_secret();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
    }

    #[test]
    fn day_counts_are_bounded() {
        let parse = |raw: Option<&str>| {
            parse_days("COMPARISON_WINDOW_DAYS", raw.map(str::to_string), 30, MAX_WINDOW_DAYS)
        };

        assert_eq!(parse(None).unwrap(), 30);
        assert_eq!(parse(Some(" ")).unwrap(), 30);
        assert_eq!(parse(Some("0")).unwrap(), 30);
        assert_eq!(parse(Some("14")).unwrap(), 14);
        assert_eq!(parse(Some("3660")).unwrap(), MAX_WINDOW_DAYS);
        assert!(parse(Some("3661")).is_err());
        assert!(parse(Some("9223372036854775807")).is_err());
        assert!(parse(Some("a month")).is_err());
    }

    #[test]
    fn dashboard_defaults_to_thirty_day_periods() {
        assert_eq!(DashboardConfig::default().comparison_window_days, 30);
    }
}

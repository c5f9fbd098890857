use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

use echo_engagement::lifecycle::DEFAULT_STALE_AFTER_MS;

/// Values that must never reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "changeme", "secret", "dev-secret-change-me"];

/// Secret used by debug builds when none is configured.
const DEV_SECRET: &str = "echo-dev-only-secret";

const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub stale_after_ms: i64,
    pub prune_interval_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), cfg!(debug_assertions))
    }

    /// Build the config from `lookup`. With `allow_dev_secret` a missing
    /// secret falls back to a fixed development value; a placeholder is
    /// always rejected.
    fn from_lookup<F>(lookup: F, allow_dev_secret: bool) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("ECHO_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) if PLACEHOLDER_SECRETS.contains(&secret.as_str()) => {
                bail!("ECHO_JWT_SECRET is still a placeholder")
            }
            Some(secret) => secret,
            None if allow_dev_secret => DEV_SECRET.to_string(),
            None => bail!("ECHO_JWT_SECRET is unset"),
        };

        let host = lookup("ECHO_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("ECHO_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("ECHO_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("ECHO_HOST must be an IP address")?;

        let db_path = PathBuf::from(lookup("ECHO_DB_PATH").unwrap_or_else(|| "echo.db".into()));

        let stale_after_ms: i64 = match lookup("ECHO_GROUP_STALE_AFTER_MS") {
            Some(raw) => raw
                .parse()
                .context("ECHO_GROUP_STALE_AFTER_MS must be a whole number of milliseconds")?,
            None => DEFAULT_STALE_AFTER_MS,
        };
        if stale_after_ms < 0 {
            bail!("ECHO_GROUP_STALE_AFTER_MS must not be negative");
        }

        let prune_interval_secs: u64 = match lookup("ECHO_PRUNE_INTERVAL_SECS") {
            Some(raw) => raw
                .parse()
                .context("ECHO_PRUNE_INTERVAL_SECS must be a whole number of seconds")?,
            None => DEFAULT_PRUNE_INTERVAL_SECS,
        };
        if prune_interval_secs == 0 {
            bail!("ECHO_PRUNE_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            stale_after_ms,
            prune_interval_secs,
        })
    }
}

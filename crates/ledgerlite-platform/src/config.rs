use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_SESSION_TTL_DAYS: i64 = 30;
const DEFAULT_OTP_TTL_SECONDS: i64 = 300;
const DEFAULT_OVERDUE_SWEEP_SECONDS: u64 = 3600;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub http_addr: String,
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    /// Absent means ledger events are only logged.
    pub redis_url: Option<String>,
    pub session_ttl_days: i64,
    pub otp_ttl_seconds: i64,
    /// Return freshly issued OTP codes in the response body. Development only.
    pub otp_debug_echo: bool,
    pub cookie_secure: bool,
    pub overdue_sweep_seconds: u64,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let session_ttl_days = parse_or(value("SESSION_TTL_DAYS"), "SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)?;
        let otp_ttl_seconds = parse_or(value("OTP_TTL_SECONDS"), "OTP_TTL_SECONDS", DEFAULT_OTP_TTL_SECONDS)?;
        let overdue_sweep_seconds = parse_or(
            value("OVERDUE_SWEEP_SECONDS"),
            "OVERDUE_SWEEP_SECONDS",
            DEFAULT_OVERDUE_SWEEP_SECONDS,
        )?;
        if session_ttl_days <= 0 || otp_ttl_seconds <= 0 || overdue_sweep_seconds == 0 {
            anyhow::bail!("SESSION_TTL_DAYS, OTP_TTL_SECONDS and OVERDUE_SWEEP_SECONDS must be positive");
        }

        Ok(Self {
            http_addr: value("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string()),
            database_url: value("DATABASE_URL"),
            redis_url: value("REDIS_URL"),
            session_ttl_days,
            otp_ttl_seconds,
            otp_debug_echo: parse_flag(value("OTP_DEBUG_ECHO"), "OTP_DEBUG_ECHO")?,
            cookie_secure: parse_flag(value("COOKIE_SECURE"), "COOKIE_SECURE")?,
            overdue_sweep_seconds,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a number (got {raw})")),
        None => Ok(default),
    }
}

fn parse_flag(raw: Option<String>, key: &str) -> Result<bool> {
    match raw.map(|raw| raw.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => anyhow::bail!("{key} must be true or false (got {other})"),
    }
}

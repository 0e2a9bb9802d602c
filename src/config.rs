use anyhow::{Context, Result, ensure};
use chrono::NaiveTime;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    /// Without a database the service keeps attendance in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub api_prefix: String,
    pub log_dir: String,

    /// Prefix of the QR check-in link, normally the public API root.
    pub checkin_base_url: String,
    /// Check-ins strictly before this time of day are Present, later ones Late.
    pub checkin_cutoff: NaiveTime,

    // Rate limiting
    pub rate_checkin_per_min: u32,
    pub rate_protected_per_min: u32,
}

/// Host plus the default `API_PREFIX`; the check-in link is appended to it.
pub const DEFAULT_CHECKIN_BASE_URL: &str = "http://localhost:8080/api";

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    or_default(key, default)
        .parse()
        .with_context(|| format!("{key} is not valid"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let cutoff = or_default("CHECKIN_CUTOFF", "09:20");
        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: or_default("API_PREFIX", "/api"),
            log_dir: or_default("LOG_DIR", "logs"),

            checkin_base_url: or_default("CHECKIN_BASE_URL", DEFAULT_CHECKIN_BASE_URL),
            checkin_cutoff: NaiveTime::parse_from_str(&cutoff, "%H:%M")
                .with_context(|| format!("CHECKIN_CUTOFF {cutoff:?} is not HH:MM"))?,

            rate_checkin_per_min: parsed("RATE_CHECKIN_PER_MIN", "30")?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,
        };

        ensure!(
            config.rate_checkin_per_min > 0 && config.rate_protected_per_min > 0,
            "rate limits must be greater than zero"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::service::build_checkin_link;
    use chrono::NaiveDate;

    #[test]
    fn default_link_lands_under_the_api_prefix() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let link = build_checkin_link(DEFAULT_CHECKIN_BASE_URL, "t", date);
        assert_eq!(
            link,
            "http://localhost:8080/api/attendance/qr-checkin?token=t&date=2025-06-10"
        );
    }
}

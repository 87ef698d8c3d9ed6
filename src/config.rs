use crate::core::constants::{
    INVITE_CODE_LENGTH, INVITE_EXPIRY_DAYS, MEMBER_CACHE_TTL_SECS, RATE_LIMIT_MAX_FAILURES,
    RATE_LIMIT_WINDOW_MINUTES,
};
use chrono::Weekday;
use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    /// Zone for dens without their own; unset means the host zone.
    pub default_timezone: Option<String>,
    pub week_start: Weekday,
    pub invite_expiry_days: i64,
    pub invite_code_length: usize,
    pub rate_limit_window_minutes: i64,
    pub rate_limit_max_failures: usize,
    pub member_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            log_level: "info".to_string(),
            default_timezone: None,
            week_start: Weekday::Sun,
            invite_expiry_days: INVITE_EXPIRY_DAYS,
            invite_code_length: INVITE_CODE_LENGTH,
            rate_limit_window_minutes: RATE_LIMIT_WINDOW_MINUTES,
            rate_limit_max_failures: RATE_LIMIT_MAX_FAILURES,
            member_cache_ttl_secs: MEMBER_CACHE_TTL_SECS,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            default_timezone: env::var("DEFAULT_TIMEZONE").ok().filter(|tz| !tz.trim().is_empty()),
            week_start: parsed("WEEK_START").unwrap_or(defaults.week_start),
            invite_expiry_days: parsed("INVITE_EXPIRY_DAYS").unwrap_or(defaults.invite_expiry_days),
            invite_code_length: parsed("INVITE_CODE_LENGTH")
                .filter(|len| *len >= 4)
                .unwrap_or(defaults.invite_code_length),
            rate_limit_window_minutes: parsed("RATE_LIMIT_WINDOW_MINUTES")
                .unwrap_or(defaults.rate_limit_window_minutes),
            rate_limit_max_failures: parsed("RATE_LIMIT_MAX_FAILURES").unwrap_or(defaults.rate_limit_max_failures),
            member_cache_ttl_secs: parsed("MEMBER_CACHE_TTL_SECS").unwrap_or(defaults.member_cache_ttl_secs),
        }
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

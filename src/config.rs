// src/config.rs
use log::warn;
use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::{DashboardError, Result};

pub const DEFAULT_CONSTITUENTS_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";
pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Accepted `LOOKBACK_YEARS` values.
pub const LOOKBACK_YEARS_RANGE: RangeInclusive<i64> = 1..=50;
/// Accepted `CACHE_TTL_MINUTES` values, up to one year.
pub const CACHE_TTL_MINUTES_RANGE: RangeInclusive<i64> = 0..=525_600;

#[derive(Debug, Clone)]
pub struct Config {
    pub fred_api_key: String,
    pub port: u16,
    /// Zero disables time-boxed expiry; entries then live until cleared.
    pub cache_ttl_minutes: i64,
    pub lookback_years: i64,
    pub constituents_url: String,
    pub fred_base_url: String,
    pub yahoo_base_url: String,
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first if a `.env` file should apply.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fred_api_key = lookup("FRED_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DashboardError::Configuration(
                    "FRED_API_KEY must be set to a FRED API key (https://fred.stlouisfed.org/docs/api/api_key.html)".to_string(),
                )
            })?;

        Ok(Config {
            fred_api_key,
            port: parse_or(&lookup, "PORT", 3030),
            cache_ttl_minutes: parse_in_range(&lookup, "CACHE_TTL_MINUTES", 60, CACHE_TTL_MINUTES_RANGE),
            lookback_years: parse_in_range(&lookup, "LOOKBACK_YEARS", 5, LOOKBACK_YEARS_RANGE),
            constituents_url: lookup("CONSTITUENTS_URL").unwrap_or_else(|| DEFAULT_CONSTITUENTS_URL.to_string()),
            fred_base_url: lookup("FRED_BASE_URL").unwrap_or_else(|| DEFAULT_FRED_BASE_URL.to_string()),
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or_else(|| DEFAULT_YAHOO_BASE_URL.to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => {
            if key == "PORT" {
                warn!("$PORT not set, defaulting to {}", default);
            }
            default
        }
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, defaulting to {}", key, raw, default);
            default
        }),
    }
}

fn parse_in_range<F>(lookup: &F, key: &str, default: i64, range: RangeInclusive<i64>) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        return value;
    }
    warn!(
        "{} must be between {} and {}, got {}, defaulting to {}",
        key,
        range.start(),
        range.end(),
        value,
        default
    );
    default
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, DashboardError::Configuration(_)));
        assert!(err.to_string().contains("FRED_API_KEY"));
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("FRED_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, DashboardError::Configuration(_)));
    }

    #[test]
    fn defaults_apply_when_optional_values_absent_or_invalid() {
        let config = Config::from_lookup(lookup_from(&[
            ("FRED_API_KEY", "abc123"),
            ("PORT", "not-a-port"),
            ("LOOKBACK_YEARS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.fred_api_key, "abc123");
        assert_eq!(config.port, 3030);
        assert_eq!(config.lookback_years, 3);
        assert_eq!(config.cache_ttl_minutes, 60);
        assert_eq!(config.constituents_url, DEFAULT_CONSTITUENTS_URL);
    }

    #[test]
    fn out_of_range_durations_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("FRED_API_KEY", "abc123"),
            ("LOOKBACK_YEARS", "1000000"),
            ("CACHE_TTL_MINUTES", "9223372036854775807"),
        ]))
        .unwrap();
        assert_eq!(config.lookback_years, 5);
        assert_eq!(config.cache_ttl_minutes, 60);

        let config = Config::from_lookup(lookup_from(&[
            ("FRED_API_KEY", "abc123"),
            ("LOOKBACK_YEARS", "-2"),
            ("CACHE_TTL_MINUTES", "0"),
        ]))
        .unwrap();
        assert_eq!(config.lookback_years, 5);
        assert_eq!(config.cache_ttl_minutes, 0);
    }
}

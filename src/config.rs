//! Runtime configuration read from the environment (after `.env`).

use chrono::Duration;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::checkout::direct::DEFAULT_TTL_SECS;
use crate::pricing::PricingRules;
use crate::{Result, StorefrontError};

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    pub catalog_url: String,
    pub direct_checkout_ttl: Duration,
    pub pricing: PricingRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./storefront-data"),
            port: 8083,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            direct_checkout_ttl: Duration::seconds(DEFAULT_TTL_SECS),
            pricing: PricingRules::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(dir) = lookup("STOREFRONT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("PORT") {
            cfg.port = parse("PORT", &port)?;
        }
        if let Some(url) = lookup("CATALOG_URL") {
            cfg.catalog_url = url;
        }
        if let Some(ttl) = lookup("DIRECT_CHECKOUT_TTL_SECS") {
            let secs: i64 = parse("DIRECT_CHECKOUT_TTL_SECS", &ttl)?;
            if secs <= 0 {
                return Err(StorefrontError::Config("DIRECT_CHECKOUT_TTL_SECS must be positive".into()));
            }
            cfg.direct_checkout_ttl = Duration::try_seconds(secs)
                .ok_or_else(|| StorefrontError::Config("DIRECT_CHECKOUT_TTL_SECS is out of range".into()))?;
        }
        if let Some(v) = lookup("FREE_SHIPPING_THRESHOLD") {
            cfg.pricing.free_shipping_threshold = non_negative("FREE_SHIPPING_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("FLAT_SHIPPING_FEE") {
            cfg.pricing.flat_shipping_fee = non_negative("FLAT_SHIPPING_FEE", &v)?;
        }
        if let Some(v) = lookup("TAX_RATE") {
            cfg.pricing.tax_rate = non_negative("TAX_RATE", &v)?;
        }
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| StorefrontError::Config(format!("{key}: cannot parse {raw:?}")))
}

fn non_negative(key: &str, raw: &str) -> Result<Decimal> {
    let value: Decimal = parse(key, raw)?;
    if value.is_sign_negative() {
        return Err(StorefrontError::Config(format!("{key} must not be negative")));
    }
    Ok(value)
}

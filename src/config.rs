// Configuration management module
// This file handles loading and parsing of the route cache settings
// from an optional YAML file overlaid by environment variables
//
// Numan Thabit 2025 Nov

use anyhow::{bail, Context, Result};
use num_bigint::BigUint;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache key generation and cached route validation
    pub cache: CacheConfig,
    /// Settings of the find-route aggregator behind the cache
    pub aggregator: AggregatorConfig,
    /// Shared (network) route cache
    pub redis: RedisConfig,
    /// In-process route cache in front of Redis
    pub local_cache: LocalCacheConfig,
}

impl AppConfig {
    /// Load configuration from `path` (if given) and `APP__`-prefixed
    /// environment variables, e.g. `APP__REDIS__URL`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let cfg = builder
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .context("build configuration sources")?;
        let app: AppConfig = cfg.try_deserialize().context("deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Yaml))
            .build()
            .context("parse yaml configuration")?;
        let app: AppConfig = cfg.try_deserialize().context("deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        self.redis.parsed_url()?;
        if !self.cache.price_impact_threshold.is_finite() {
            bail!("cache.price_impact_threshold must be finite");
        }
        if self.cache.shrink_amount_in_threshold < 0.0 {
            bail!("cache.shrink_amount_in_threshold must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL used when no range matches
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Exact amount points (decimal-adjusted) cached in `Point` mode
    pub ttl_by_amount: Vec<CachePoint>,
    /// Ascending USD lower bounds selecting the TTL
    pub ttl_by_amount_usd_range: Vec<CacheRange>,
    /// Ascending raw amount lower bounds selecting the TTL
    pub ttl_by_amount_range: Vec<AmountInCacheRange>,
    /// Max allowed `(in - out) / in` for a cached route
    pub price_impact_threshold: f64,
    /// Shrink function applied to the USD notional: round, pow, decimal, logarithm
    pub shrink_func_name: String,
    pub shrink_func_pow_exp: f64,
    pub shrink_decimal_base: f64,
    pub shrink_func_log_percent: f64,
    /// Shrink functions applied to the raw amount; each one yields a key
    pub shrink_amount_in_configs: Vec<ShrinkFunctionConfig>,
    /// Max allowed drift between a raw amount and its shrunk value
    pub shrink_amount_in_threshold: f64,
    pub enable_new_cache_key_generator: bool,
    /// Trades below this USD notional are keyed by raw amount
    pub min_amount_in_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CachePoint {
    pub amount: f64,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheRange {
    pub amount_usd_lower_bound: f64,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AmountInCacheRange {
    #[serde(deserialize_with = "biguint_str::deserialize")]
    pub amount_lower_bound: BigUint,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShrinkFunctionConfig {
    pub shrink_func_name: String,
    /// Base for `decimal`, percent for `logarithm`
    #[serde(default)]
    pub shrink_func_constant: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Max number of ranked pools fetched per request
    pub best_pools_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            best_pools_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    /// Key namespace, usually the chain name
    pub prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            prefix: "ethereum".to_string(),
        }
    }
}

impl RedisConfig {
    pub fn parsed_url(&self) -> Result<Url> {
        let url =
            Url::parse(&self.url).with_context(|| format!("invalid redis url: {}", self.url))?;
        match url.scheme() {
            "redis" | "rediss" => Ok(url),
            other => bail!("unsupported redis url scheme: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalCacheConfig {
    /// Max number of routes held in process
    pub max_capacity: u64,
    /// Upper bound on how long a route lives in process
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Duration::from_secs(5),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod biguint_str {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Str(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(BigUint::from(v)),
            Raw::Str(s) => crate::business::parse_amount(&s)
                .ok_or_else(|| D::Error::custom(format!("invalid amount: {s}"))),
        }
    }
}

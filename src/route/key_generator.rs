// Route cache key generator
// Decides whether a request is cacheable and derives its key(s) and TTL
// from an exact amount point, the shrunk USD notional or the shrunk amount
//
// Numan Thabit 2025 Nov

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{error, warn};

use crate::aggregator::AggregateParams;
use crate::business::{amount_without_decimals, calc_amount_usd, float64_almost_equal};
use crate::config::CacheConfig;
use crate::errors::RouteError;
use crate::metrics;
use crate::route::key::{CacheMode, RouteCacheKey, RouteCacheKeyTtl};
use crate::route::shrink::{shrink_func_by_name, ShrinkFunc, ShrinkParams};

struct KeyGeneratorState {
    config: CacheConfig,
    usd_shrink: ShrinkFunc,
    amount_shrinks: Vec<ShrinkFunc>,
}

pub struct RouteKeyGenerator {
    state: RwLock<KeyGeneratorState>,
}

fn usd_shrink_params(config: &CacheConfig) -> ShrinkParams {
    ShrinkParams {
        pow_exp: config.shrink_func_pow_exp,
        decimal_base: config.shrink_decimal_base,
        log_percent: config.shrink_func_log_percent,
    }
}

fn build_usd_shrink(config: &CacheConfig) -> Result<ShrinkFunc, RouteError> {
    shrink_func_by_name(&config.shrink_func_name, usd_shrink_params(config))
}

fn build_amount_shrinks(config: &CacheConfig) -> Vec<Result<ShrinkFunc, RouteError>> {
    config
        .shrink_amount_in_configs
        .iter()
        .map(|c| {
            shrink_func_by_name(
                &c.shrink_func_name,
                ShrinkParams {
                    pow_exp: 0.0,
                    decimal_base: c.shrink_func_constant,
                    log_percent: c.shrink_func_constant,
                },
            )
        })
        .collect()
}

impl RouteKeyGenerator {
    pub fn new(config: CacheConfig) -> Self {
        let usd_shrink = build_usd_shrink(&config).unwrap_or_else(|err| {
            warn!(error = %err, "usd shrink function unavailable; falling back to round");
            Arc::new(|v: f64| v.round_ties_even())
        });

        let amount_shrinks = build_amount_shrinks(&config)
            .into_iter()
            .filter_map(|built| {
                built
                    .map_err(|err| warn!(error = %err, "skipping amount shrink function"))
                    .ok()
            })
            .collect();

        Self {
            state: RwLock::new(KeyGeneratorState {
                config,
                usd_shrink,
                amount_shrinks,
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config
            .clone()
    }

    /// Derive the cache keys for a request. An empty result means the request
    /// bypasses the cache.
    pub fn gen_key(&self, params: &AggregateParams) -> Result<Vec<RouteCacheKeyTtl>, RouteError> {
        self.gen_key_with(params, |_| ()).0
    }

    /// `gen_key` plus a projection of the config the keys were derived
    /// under, both taken from one read of the shared state.
    pub fn gen_key_with<T>(
        &self,
        params: &AggregateParams,
        project: impl FnOnce(&CacheConfig) -> T,
    ) -> (Result<Vec<RouteCacheKeyTtl>, RouteError>, T) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let snapshot = project(&state.config);
        (state.gen_key(params), snapshot)
    }

    /// Hot reload. Shrink functions are rebuilt only when the cache config
    /// actually changed.
    pub fn apply_config(&self, config: &CacheConfig) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.config != *config {
            match build_usd_shrink(config) {
                Ok(f) => state.usd_shrink = f,
                Err(err) => error!(error = %err, "cannot apply usd shrink function from config"),
            }

            let mut rebuilt = Vec::with_capacity(config.shrink_amount_in_configs.len());
            let mut complete = true;
            for built in build_amount_shrinks(config) {
                match built {
                    Ok(f) => rebuilt.push(f),
                    Err(err) => {
                        error!(error = %err, "cannot apply amount shrink function from config");
                        complete = false;
                    }
                }
            }
            if complete {
                state.amount_shrinks = rebuilt;
            }
        }

        state.config = config.clone();
    }
}

impl KeyGeneratorState {
    fn gen_key(&self, params: &AggregateParams) -> Result<Vec<RouteCacheKeyTtl>, RouteError> {
        if params.excluded_pools.len() > 1 {
            metrics::record_cache_miss("excludedPools");
            return Ok(Vec::new());
        }

        if params.token_in.decimals == 0 {
            return Err(RouteError::MissingTokenDecimals);
        }

        if self.config.enable_new_cache_key_generator {
            self.gen_key_v2(params)
        } else {
            self.gen_key_v1(params)
        }
    }

    fn gen_key_v1(&self, params: &AggregateParams) -> Result<Vec<RouteCacheKeyTtl>, RouteError> {
        if let Some(point) = self.key_by_cache_point(params) {
            return Ok(vec![point]);
        }

        if params.token_in_price_usd <= 0.0 {
            return Err(RouteError::NoTokenInPrice);
        }

        let amount_in_usd = calc_amount_usd(
            &params.amount_in,
            params.token_in.decimals,
            params.token_in_price_usd,
        );
        Ok(vec![self.key_by_amount_in_usd(params, amount_in_usd)])
    }

    fn gen_key_v2(&self, params: &AggregateParams) -> Result<Vec<RouteCacheKeyTtl>, RouteError> {
        let amount_in_usd = if params.token_in_price_usd > 0.0 {
            calc_amount_usd(
                &params.amount_in,
                params.token_in.decimals,
                params.token_in_price_usd,
            )
        } else {
            0.0
        };

        if amount_in_usd <= self.config.min_amount_in_usd {
            return self.keys_by_amount_in(params);
        }

        Ok(vec![self.key_by_amount_in_usd(params, amount_in_usd)])
    }

    fn key_by_cache_point(&self, params: &AggregateParams) -> Option<RouteCacheKeyTtl> {
        let amount = amount_without_decimals(&params.amount_in, params.token_in.decimals);
        self.config
            .ttl_by_amount
            .iter()
            .find(|point| float64_almost_equal(point.amount, amount))
            .map(|point| RouteCacheKeyTtl {
                key: new_key(params, CacheMode::Point, amount.to_string()),
                ttl: point.ttl,
            })
    }

    fn key_by_amount_in_usd(
        &self,
        params: &AggregateParams,
        amount_in_usd: f64,
    ) -> RouteCacheKeyTtl {
        let shrunk = (self.usd_shrink)(amount_in_usd);

        let mut ttl = self.config.default_ttl;
        for range in &self.config.ttl_by_amount_usd_range {
            if shrunk > range.amount_usd_lower_bound {
                ttl = range.ttl;
            }
        }

        RouteCacheKeyTtl {
            key: new_key(params, CacheMode::RangeByUsd, shrunk.to_string()),
            ttl,
        }
    }

    fn keys_by_amount_in(
        &self,
        params: &AggregateParams,
    ) -> Result<Vec<RouteCacheKeyTtl>, RouteError> {
        let ttl = self.ttl_by_amount_range(params);
        let amount = amount_without_decimals(&params.amount_in, params.token_in.decimals);

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for shrink in &self.amount_shrinks {
            let shrunk = shrink(amount);
            // Large amounts are slippage sensitive, a coarse bucket is unsafe to reuse
            if (shrunk - amount).abs() >= self.config.shrink_amount_in_threshold {
                warn!(
                    amount,
                    shrunk,
                    threshold = self.config.shrink_amount_in_threshold,
                    "shrunk amount drifts above threshold"
                );
                continue;
            }

            let formatted = format!("{shrunk:.0}");
            if !seen.insert(formatted.clone()) {
                continue;
            }
            keys.push(RouteCacheKeyTtl {
                key: new_key(params, CacheMode::RangeByAmount, formatted),
                ttl,
            });
        }

        if keys.is_empty() {
            return Err(RouteError::ShrunkAmountAboveThreshold);
        }
        Ok(keys)
    }

    fn ttl_by_amount_range(&self, params: &AggregateParams) -> Duration {
        let mut ttl = self.config.default_ttl;
        for range in &self.config.ttl_by_amount_range {
            if params.amount_in >= range.amount_lower_bound {
                ttl = range.ttl;
            }
        }
        ttl
    }
}

fn new_key(params: &AggregateParams, cache_mode: CacheMode, amount_in: String) -> RouteCacheKey {
    RouteCacheKey {
        token_in: params.token_in.address.to_lowercase(),
        token_out: params.token_out.address.to_lowercase(),
        cache_mode,
        amount_in,
        save_gas: params.save_gas,
        gas_include: params.gas_include,
        dexes: params.sources.iter().cloned().collect(),
        is_path_generator_enabled: params.is_path_generator_enabled,
        is_hill_climbing_enabled: params.is_hill_climbing_enabled,
        excluded_pools: params.excluded_pools.clone(),
        use_private_limit_order: !params.limit_order_allowed_senders.is_empty(),
    }
}

// Caching aggregator
// Decorates an aggregator with a route cache: serves re-priced cached routes
// when they still replay within the price impact threshold, otherwise
// delegates and writes the fresh route back
//
// Numan Thabit 2025 Nov

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use super::{AggregateParams, Aggregator};
use crate::business::amount_without_decimals;
use crate::config::{AppConfig, CacheConfig};
use crate::context::RequestContext;
use crate::errors::RouteError;
use crate::metrics;
use crate::pool::PoolManager;
use crate::repository::RouteCacheRepository;
use crate::route::{
    CachedRoute, RouteCacheKey, RouteCacheKeyTtl, RouteKeyGenerator, RouteSummaries,
    RouteSummarizer, RouteSummary, SimpleRoute,
};

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    min_amount_in_usd: f64,
    price_impact: f64,
}

impl Thresholds {
    fn from_config(config: &CacheConfig) -> Self {
        Self {
            min_amount_in_usd: config.min_amount_in_usd,
            price_impact: config.price_impact_threshold,
        }
    }

    /// Tiny or unpriced inputs have a meaningless price impact.
    fn exceeded_by(&self, summary: &RouteSummary) -> Option<f64> {
        if summary.amount_in_usd < self.min_amount_in_usd {
            return None;
        }
        let impact = summary.price_impact();
        (impact > self.price_impact).then_some(impact)
    }
}

pub struct CachingAggregator {
    aggregator: Arc<dyn Aggregator>,
    repository: Arc<dyn RouteCacheRepository>,
    summarizer: RouteSummarizer,
    key_generator: RouteKeyGenerator,
}

impl CachingAggregator {
    pub fn new(
        aggregator: Arc<dyn Aggregator>,
        repository: Arc<dyn RouteCacheRepository>,
        pool_manager: Arc<dyn PoolManager>,
        config: CacheConfig,
    ) -> Self {
        Self {
            aggregator,
            repository,
            summarizer: RouteSummarizer::new(pool_manager),
            key_generator: RouteKeyGenerator::new(config),
        }
    }

    /// `Ok(None)` is a miss. Errors are only those that must reach the caller.
    async fn route_from_cache(
        &self,
        ctx: &RequestContext,
        params: &AggregateParams,
        keys: &[RouteCacheKeyTtl],
        thresholds: Thresholds,
    ) -> Result<Option<RouteSummaries>, RouteError> {
        let Some((best_key, cached)) = self.best_cached_route(ctx, params, keys).await? else {
            metrics::record_cache_miss("getCachedRouteFailed");
            return Ok(None);
        };
        let key_name = best_key.key.canonical("");

        // best effort: a failed replay only leaves amm_best empty
        let amm_best = match &cached.amm_route {
            Some(route) => match self.summarizer.summarize_simple_route(ctx, route, params).await {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(
                        request_id = %ctx.request_id,
                        key = %key_name,
                        error = %err,
                        "summarize cached amm route failed"
                    );
                    None
                }
            },
            None => None,
        };

        let summary = match self
            .summarizer
            .summarize_simple_route(ctx, &cached.best_route, params)
            .await
        {
            Ok(summary) => summary,
            Err(err) if err.is_cache_invalidating() => {
                debug!(
                    request_id = %ctx.request_id,
                    client_id = %ctx.client_id,
                    key = %key_name,
                    error = %err,
                    "cache missed: summarize cached route failed"
                );
                metrics::record_cache_miss("summarizeCachedRouteFailed");
                self.evict(ctx, keys).await?;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if let Some(impact) = thresholds.exceeded_by(&summary) {
            debug!(
                request_id = %ctx.request_id,
                client_id = %ctx.client_id,
                key = %key_name,
                error = %RouteError::PriceImpactIsGreaterThanThreshold(impact),
                "cache missed: price impact is greater than threshold"
            );
            metrics::record_cache_miss("priceImpactIsGreaterThanEpsilon");
            // overlapping inputs may share these keys; they are all dropped
            self.evict(ctx, keys).await?;
            return Ok(None);
        }

        debug!(
            request_id = %ctx.request_id,
            client_id = %ctx.client_id,
            key = %key_name,
            "cache hit"
        );
        metrics::record_cache_hit();
        Ok(Some(RouteSummaries {
            best: summary,
            amm_best,
        }))
    }

    /// The hit whose key amount lies closest to the request amount, first
    /// requested key winning ties.
    async fn best_cached_route(
        &self,
        ctx: &RequestContext,
        params: &AggregateParams,
        keys: &[RouteCacheKeyTtl],
    ) -> Result<Option<(RouteCacheKeyTtl, Arc<CachedRoute>)>, RouteError> {
        // hits carry their remaining TTL, so match on the key alone
        let mut cached: HashMap<RouteCacheKey, Arc<CachedRoute>> =
            match ctx.run(self.repository.get(ctx, keys)).await? {
                Ok(cached) => cached.into_iter().map(|(k, route)| (k.key, route)).collect(),
                Err(err) => {
                    warn!(request_id = %ctx.request_id, error = %err, "route cache lookup failed");
                    return Ok(None);
                }
            };

        let amount_in = amount_without_decimals(&params.amount_in, params.token_in.decimals);
        let mut best: Option<(&RouteCacheKeyTtl, f64)> = None;
        for key in keys.iter().filter(|k| cached.contains_key(&k.key)) {
            let Ok(key_amount) = key.key.amount_in.parse::<f64>() else {
                debug!(amount_in = %key.key.amount_in, "cached key amount is not a number");
                continue;
            };
            let diff = (key_amount - amount_in).abs();
            if best.map_or(true, |(_, min)| diff < min) {
                best = Some((key, diff));
            }
        }

        Ok(best.and_then(|(key, _)| cached.remove(&key.key).map(|route| (key.clone(), route))))
    }

    async fn evict(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
    ) -> Result<(), RouteError> {
        if let Err(err) = ctx.run(self.repository.del(ctx, keys)).await? {
            warn!(request_id = %ctx.request_id, error = %err, "route cache eviction failed");
        }
        Ok(())
    }

    async fn write_back(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
        summaries: &RouteSummaries,
    ) {
        let route = Arc::new(CachedRoute {
            best_route: SimpleRoute::from_summary(&summaries.best),
            amm_route: summaries.amm_best.as_ref().map(SimpleRoute::from_summary),
        });
        let routes = vec![route; keys.len()];
        match ctx.run(self.repository.set(ctx, keys, &routes)).await {
            Ok(Ok(written)) if written.len() < keys.len() => {
                warn!(
                    request_id = %ctx.request_id,
                    written = written.len(),
                    requested = keys.len(),
                    "route cache write was partial"
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                error!(request_id = %ctx.request_id, error = %err, "route cache write failed")
            }
            Err(err) => {
                error!(request_id = %ctx.request_id, error = %err, "route cache write aborted")
            }
        }
    }

    fn is_cacheable(
        &self,
        params: &AggregateParams,
        summary: &RouteSummary,
        thresholds: Thresholds,
    ) -> bool {
        thresholds.exceeded_by(summary).is_none()
            && !summary.is_merge_swap_route(&params.token_in.address, &params.token_out.address)
    }
}

#[async_trait]
impl Aggregator for CachingAggregator {
    #[tracing::instrument(
        skip_all,
        fields(request_id = %ctx.request_id, client_id = %ctx.client_id)
    )]
    async fn aggregate(
        &self,
        ctx: &RequestContext,
        params: &AggregateParams,
    ) -> Result<RouteSummaries, RouteError> {
        let (keys, thresholds) = self.key_generator.gen_key_with(params, Thresholds::from_config);
        let keys = match keys {
            Ok(keys) => keys,
            Err(err) if err.is_non_cacheable() => {
                debug!(error = %err, "request is not cacheable");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "cache key generation failed");
                Vec::new()
            }
        };

        if keys.is_empty() {
            return self.aggregator.aggregate(ctx, params).await;
        }

        if let Some(summaries) = self.route_from_cache(ctx, params, &keys, thresholds).await? {
            return Ok(summaries);
        }

        let summaries = self.aggregator.aggregate(ctx, params).await?;
        if self.is_cacheable(params, &summaries.best, thresholds) {
            self.write_back(ctx, &keys, &summaries).await;
        }
        Ok(summaries)
    }

    fn apply_config(&self, config: &AppConfig) {
        self.key_generator.apply_config(&config.cache);
        self.aggregator.apply_config(config);
    }
}

// In-process route cache tier
// Serves fresh local entries and falls back to the wrapped tier, back-filling
// with the time the entry has left, capped by the local TTL
//
// Numan Thabit 2025 Nov

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use super::RouteCacheRepository;
use crate::config::LocalCacheConfig;
use crate::context::RequestContext;
use crate::route::{CachedRoute, RouteCacheKey, RouteCacheKeyTtl};

#[derive(Clone)]
struct LocalEntry {
    route: Arc<CachedRoute>,
    expires_at: Instant,
}

pub struct LocalRouteRepository {
    inner: Arc<dyn RouteCacheRepository>,
    cache: Cache<RouteCacheKey, LocalEntry>,
    ttl: Duration,
}

impl LocalRouteRepository {
    pub fn new(inner: Arc<dyn RouteCacheRepository>, config: &LocalCacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if !config.ttl.is_zero() {
            builder = builder.time_to_live(config.ttl);
        }
        Self {
            inner,
            cache: builder.build(),
            ttl: config.ttl,
        }
    }

    /// `key.ttl` is what the entry has left in the wrapped tier.
    async fn remember(&self, key: &RouteCacheKeyTtl, route: Arc<CachedRoute>, now: Instant) {
        let ttl = key.ttl.min(self.ttl);
        if ttl.is_zero() {
            return;
        }
        self.cache
            .insert(
                key.key.clone(),
                LocalEntry {
                    route,
                    expires_at: now + ttl,
                },
            )
            .await;
    }
}

#[async_trait]
impl RouteCacheRepository for LocalRouteRepository {
    async fn get(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
    ) -> Result<HashMap<RouteCacheKeyTtl, Arc<CachedRoute>>> {
        let now = Instant::now();
        let mut found = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();

        for key in keys {
            match self.cache.get(&key.key).await {
                Some(entry) if entry.expires_at > now => {
                    let left = RouteCacheKeyTtl {
                        key: key.key.clone(),
                        ttl: entry.expires_at - now,
                    };
                    found.insert(left, entry.route);
                }
                Some(_) => {
                    self.cache.invalidate(&key.key).await;
                    missing.push(key.clone());
                }
                None => missing.push(key.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        let fetched = match self.inner.get(ctx, &missing).await {
            Ok(fetched) => fetched,
            Err(err) if !found.is_empty() => {
                warn!(
                    request_id = %ctx.request_id,
                    error = %err,
                    "shared route cache unavailable; serving local entries"
                );
                return Ok(found);
            }
            Err(err) => return Err(err),
        };

        for (key, route) in fetched {
            self.remember(&key, route.clone(), now).await;
            found.insert(key, route);
        }
        Ok(found)
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
        routes: &[Arc<CachedRoute>],
    ) -> Result<Vec<Arc<CachedRoute>>> {
        let written = self.inner.set(ctx, keys, routes).await?;

        let now = Instant::now();
        for (key, route) in keys.iter().zip(routes) {
            if written.iter().any(|w| Arc::ptr_eq(w, route)) {
                self.remember(key, route.clone(), now).await;
            }
        }
        Ok(written)
    }

    async fn del(&self, ctx: &RequestContext, keys: &[RouteCacheKeyTtl]) -> Result<()> {
        join_all(keys.iter().map(|key| self.cache.invalidate(&key.key))).await;
        self.inner.del(ctx, keys).await
    }
}

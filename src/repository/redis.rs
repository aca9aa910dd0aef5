// Redis route cache tier
// Shared across service instances; one string value per key, expiring
// with the key's TTL
//
// Numan Thabit 2025 Nov

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::codec::{decode_route, encode_route};
use super::RouteCacheRepository;
use crate::config::RedisConfig;
use crate::context::RequestContext;
use crate::route::{CachedRoute, RouteCacheKeyTtl};

#[derive(Clone)]
pub struct RedisRouteRepository {
    conn: ConnectionManager,
    prefix: String,
}

impl fmt::Debug for RedisRouteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRouteRepository")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisRouteRepository {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = config.parsed_url()?;
        let client = redis::Client::open(url.as_str())
            .with_context(|| format!("open redis client {}", url))?;
        let conn = ConnectionManager::new(client)
            .await
            .context("create redis connection manager")?;
        info!(prefix = %config.prefix, "redis route cache connected");
        Ok(Self::new(conn, config.prefix.clone()))
    }

    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn storage_keys(&self, keys: &[RouteCacheKeyTtl]) -> Vec<String> {
        keys.iter()
            .map(|k| k.key.storage_key(&self.prefix))
            .collect()
    }
}

/// Time left on an entry per `PTTL`, capped at the TTL it was requested
/// with. `None` once the key is gone (`-2`) or about to go.
pub(crate) fn remaining_ttl(pttl_ms: i64, requested: Duration) -> Option<Duration> {
    match pttl_ms {
        // no expiry set
        -1 => Some(requested),
        ms if ms > 0 => Some(Duration::from_millis(ms.unsigned_abs()).min(requested)),
        _ => None,
    }
}

/// Whole seconds, rounded up, never zero.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl RouteCacheRepository for RedisRouteRepository {
    async fn get(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
    ) -> Result<HashMap<RouteCacheKeyTtl, Arc<CachedRoute>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let storage_keys = self.storage_keys(keys);
        let mut pipe = redis::pipe();
        pipe.cmd("MGET").arg(&storage_keys);
        for storage_key in &storage_keys {
            pipe.cmd("PTTL").arg(storage_key);
        }
        let mut conn = self.conn.clone();
        let replies: Vec<redis::Value> = pipe
            .query_async(&mut conn)
            .await
            .context("redis MGET with PTTL")?;

        let Some((values, ttls)) = replies.split_first() else {
            bail!("redis MGET returned no reply");
        };
        let raw: Vec<Option<String>> =
            redis::from_redis_value(values).context("decode redis MGET reply")?;
        let ttls = ttls
            .iter()
            .map(|reply| redis::from_redis_value::<i64>(reply).context("decode redis PTTL reply"))
            .collect::<Result<Vec<_>>>()?;

        let mut routes = HashMap::with_capacity(keys.len());
        for (((key, storage_key), payload), pttl) in
            keys.iter().zip(&storage_keys).zip(raw).zip(ttls)
        {
            let Some(payload) = payload else { continue };
            let Some(ttl) = remaining_ttl(pttl, key.ttl) else {
                debug!(key = %storage_key, "cached route expired during lookup");
                continue;
            };
            match decode_route(&payload) {
                Ok(route) => {
                    let key = RouteCacheKeyTtl {
                        key: key.key.clone(),
                        ttl,
                    };
                    routes.insert(key, Arc::new(route));
                }
                Err(err) => warn!(
                    request_id = %ctx.request_id,
                    key = %storage_key,
                    error = %err,
                    "skipping undecodable cached route"
                ),
            }
        }
        debug!(requested = keys.len(), found = routes.len(), "redis route lookup");
        Ok(routes)
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
        routes: &[Arc<CachedRoute>],
    ) -> Result<Vec<Arc<CachedRoute>>> {
        if keys.len() != routes.len() {
            bail!("{} keys for {} routes", keys.len(), routes.len());
        }

        let mut pipe = redis::pipe();
        let mut written = Vec::with_capacity(routes.len());
        for (key, route) in keys.iter().zip(routes) {
            let storage_key = key.key.storage_key(&self.prefix);
            let payload = match encode_route(route) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(
                        request_id = %ctx.request_id,
                        key = %storage_key,
                        error = %err,
                        "skipping unencodable route"
                    );
                    continue;
                }
            };
            pipe.cmd("SET")
                .arg(storage_key)
                .arg(payload)
                .arg("EX")
                .arg(ttl_seconds(key.ttl))
                .ignore();
            written.push(route.clone());
        }

        if written.is_empty() {
            return Ok(written);
        }
        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .context("redis pipelined SET")?;
        Ok(written)
    }

    async fn del(&self, _ctx: &RequestContext, keys: &[RouteCacheKeyTtl]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(self.storage_keys(keys))
            .query_async::<_, i64>(&mut conn)
            .await
            .context("redis DEL")?;
        Ok(())
    }
}

// Route cache repository
// Batched get/set/del of cached routes by cache key, with a shared Redis
// tier and an in-process tier in front of it
//
// Numan Thabit 2025 Nov

pub mod codec;
pub mod local;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::route::{CachedRoute, RouteCacheKeyTtl};

pub use self::local::LocalRouteRepository;
pub use self::redis::RedisRouteRepository;

#[async_trait]
pub trait RouteCacheRepository: Send + Sync {
    /// Keys without a stored route are absent from the result. Returned keys
    /// carry the time their entry has left, never more than requested.
    async fn get(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
    ) -> Result<HashMap<RouteCacheKeyTtl, Arc<CachedRoute>>>;

    /// Store `routes[i]` under `keys[i]`. Returns the routes actually written.
    async fn set(
        &self,
        ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
        routes: &[Arc<CachedRoute>],
    ) -> Result<Vec<Arc<CachedRoute>>>;

    async fn del(&self, ctx: &RequestContext, keys: &[RouteCacheKeyTtl]) -> Result<()>;
}

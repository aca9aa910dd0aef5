// In-memory collaborators for the aggregator integration tests
//
// Numan Thabit 2025 Nov

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aggr_route_cache::aggregator::{
    AggregateParams, Aggregator, FindRouteParams, FoundRoutes, PoolRankRepository,
    PriceRepository, RouteFinder, Token, TokenInfo, TokenRepository,
};
use aggr_route_cache::config::{AppConfig, CacheConfig, CacheRange};
use aggr_route_cache::pool::{
    CalcAmountOutParams, CalcAmountOutResult, FindRouteState, PoolManager, PoolManagerExtraData,
    PoolSimulator, StateRoot, TokenAmount, UpdateBalanceParams,
};
use aggr_route_cache::repository::RouteCacheRepository;
use aggr_route_cache::route::{
    summarize_route, CachedRoute, Path, Route, RouteCacheKey, RouteCacheKeyTtl, RouteSummaries,
    RouteSummary,
};
use aggr_route_cache::{RequestContext, RouteError};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero;

pub const TOKEN_A: &str = "0xaaaa";
pub const TOKEN_B: &str = "0xbbbb";
pub const TOKEN_C: &str = "0xcccc";

/// Constant product pool without fee.
#[derive(Debug, Clone)]
pub struct XykPool {
    address: String,
    tokens: Vec<String>,
    reserves: Vec<BigUint>,
}

impl XykPool {
    pub fn new(address: &str, token0: &str, token1: &str, reserve0: u64, reserve1: u64) -> Self {
        Self {
            address: address.to_string(),
            tokens: vec![token0.to_string(), token1.to_string()],
            reserves: vec![BigUint::from(reserve0), BigUint::from(reserve1)],
        }
    }

    fn index_of(&self, token: &str) -> Result<usize> {
        self.tokens
            .iter()
            .position(|t| t == token)
            .ok_or_else(|| anyhow!("token {token} not in pool {}", self.address))
    }
}

impl PoolSimulator for XykPool {
    fn address(&self) -> &str {
        &self.address
    }

    fn exchange(&self) -> &str {
        "uniswap"
    }

    fn pool_type(&self) -> &str {
        "uniswap-v2"
    }

    fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn calc_amount_out(&self, params: CalcAmountOutParams<'_>) -> Result<CalcAmountOutResult> {
        let i = self.index_of(&params.token_amount_in.token)?;
        let o = self.index_of(params.token_out)?;
        if i == o {
            bail!("same token in and out");
        }
        let amount_in = &params.token_amount_in.amount;
        let out = &self.reserves[o] * amount_in / (&self.reserves[i] + amount_in);
        Ok(CalcAmountOutResult {
            token_amount_out: TokenAmount::new(params.token_out, out),
            fee: TokenAmount::new(params.token_out, BigUint::zero()),
            gas: 60_000,
            swap_info: serde_json::Value::Null,
        })
    }

    fn update_balance(&mut self, params: UpdateBalanceParams<'_>) {
        if let (Ok(i), Ok(o)) = (
            self.index_of(&params.token_amount_in.token),
            self.index_of(&params.token_amount_out.token),
        ) {
            self.reserves[i] += &params.token_amount_in.amount;
            self.reserves[o] -= &params.token_amount_out.amount;
        }
    }

    fn clone_box(&self) -> Box<dyn PoolSimulator> {
        Box::new(self.clone())
    }
}

#[derive(Default)]
pub struct FakePoolManager {
    pools: Mutex<HashMap<String, Arc<dyn PoolSimulator>>>,
    /// Limit order pools, served only to requests naming allowed senders
    private: Mutex<HashSet<String>>,
    pub state_calls: AtomicUsize,
    pub fail: Mutex<bool>,
}

impl FakePoolManager {
    pub fn with_pools(pools: Vec<XykPool>) -> Arc<Self> {
        let manager = Self::default();
        for pool in pools {
            manager.insert(pool);
        }
        Arc::new(manager)
    }

    pub fn insert(&self, pool: XykPool) {
        self.pools
            .lock()
            .unwrap()
            .insert(pool.address().to_string(), Arc::new(pool));
    }

    pub fn insert_private(&self, pool: XykPool) {
        self.private.lock().unwrap().insert(pool.address().to_string());
        self.insert(pool);
    }

    pub fn remove(&self, address: &str) {
        self.pools.lock().unwrap().remove(address);
    }

    pub fn state(&self, addresses: &[&str]) -> FindRouteState {
        let pools = self.pools.lock().unwrap();
        FindRouteState {
            pools: Arc::new(
                addresses
                    .iter()
                    .filter_map(|a| pools.get(*a).map(|p| (a.to_string(), p.clone())))
                    .collect(),
            ),
            swap_limits: HashMap::new(),
        }
    }
}

#[async_trait]
impl PoolManager for FakePoolManager {
    async fn latest_state_root(&self) -> Result<Option<StateRoot>> {
        Ok(Some([7u8; 32]))
    }

    async fn get_state_by_pool_addresses(
        &self,
        addresses: &[String],
        _sources: &[String],
        _state_root: Option<StateRoot>,
        extra: &PoolManagerExtraData,
    ) -> Result<FindRouteState> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            bail!("pool service unavailable");
        }
        let private = self.private.lock().unwrap();
        let refs: Vec<&str> = addresses
            .iter()
            .filter(|a| !extra.limit_order_allowed_senders.is_empty() || !private.contains(*a))
            .map(String::as_str)
            .collect();
        Ok(self.state(&refs))
    }
}

/// Route cache held in a map, recording every call.
#[derive(Default)]
pub struct MemoryRepository {
    pub routes: Mutex<HashMap<RouteCacheKey, (Duration, Arc<CachedRoute>)>>,
    pub gets: AtomicUsize,
    pub deleted: Mutex<Vec<RouteCacheKeyTtl>>,
    pub fail_get: Mutex<bool>,
}

impl MemoryRepository {
    pub fn stored(&self, key: &RouteCacheKey) -> Option<(Duration, Arc<CachedRoute>)> {
        self.routes.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.lock().unwrap().len()
    }
}

#[async_trait]
impl RouteCacheRepository for MemoryRepository {
    async fn get(
        &self,
        _ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
    ) -> Result<HashMap<RouteCacheKeyTtl, Arc<CachedRoute>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if *self.fail_get.lock().unwrap() {
            bail!("connection refused");
        }
        let routes = self.routes.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|k| routes.get(&k.key).map(|(_, r)| (k.clone(), r.clone())))
            .collect())
    }

    async fn set(
        &self,
        _ctx: &RequestContext,
        keys: &[RouteCacheKeyTtl],
        routes: &[Arc<CachedRoute>],
    ) -> Result<Vec<Arc<CachedRoute>>> {
        let mut stored = self.routes.lock().unwrap();
        for (k, r) in keys.iter().zip(routes) {
            stored.insert(k.key.clone(), (k.ttl, r.clone()));
        }
        Ok(routes.to_vec())
    }

    async fn del(&self, _ctx: &RequestContext, keys: &[RouteCacheKeyTtl]) -> Result<()> {
        let mut stored = self.routes.lock().unwrap();
        for k in keys {
            stored.remove(&k.key);
        }
        self.deleted.lock().unwrap().extend_from_slice(keys);
        Ok(())
    }
}

/// Stand-in for the finder-backed aggregator: always summarizes one fixed
/// route, plus a fixed AMM route when given one.
pub struct StaticAggregator {
    pool_manager: Arc<FakePoolManager>,
    route: Route,
    amm_route: Option<Route>,
    pub calls: AtomicUsize,
    pub applied: Mutex<Vec<AppConfig>>,
}

impl StaticAggregator {
    pub fn new(pool_manager: Arc<FakePoolManager>, route: Route) -> Arc<Self> {
        Self::with_amm_route(pool_manager, route, None)
    }

    pub fn with_amm_route(
        pool_manager: Arc<FakePoolManager>,
        route: Route,
        amm_route: Option<Route>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool_manager,
            route,
            amm_route,
            calls: AtomicUsize::new(0),
            applied: Mutex::new(Vec::new()),
        })
    }

    fn summarize(
        &self,
        route: &Route,
        params: &AggregateParams,
    ) -> Result<RouteSummary, RouteError> {
        let pools: Vec<&str> = route
            .paths
            .iter()
            .flat_map(|p| p.pool_addresses.iter().map(String::as_str))
            .collect();
        let state = self.pool_manager.state(&pools);
        summarize_route(route, params, &state)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Aggregator for StaticAggregator {
    async fn aggregate(
        &self,
        _ctx: &RequestContext,
        params: &AggregateParams,
    ) -> Result<RouteSummaries, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let best = self.summarize(&self.route, params)?;
        let amm_best = match &self.amm_route {
            Some(route) => Some(self.summarize(route, params)?),
            None => None,
        };
        Ok(RouteSummaries { best, amm_best })
    }

    fn apply_config(&self, config: &AppConfig) {
        self.applied.lock().unwrap().push(config.clone());
    }
}

pub struct StaticPoolRank(pub Vec<String>);

#[async_trait]
impl PoolRankRepository for StaticPoolRank {
    async fn find_best_pool_ids(
        &self,
        _token_in: &str,
        _token_out: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

pub struct StaticTokens;

#[async_trait]
impl TokenRepository for StaticTokens {
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<Vec<TokenInfo>> {
        Ok(addresses
            .iter()
            .map(|a| TokenInfo {
                address: a.clone(),
                symbol: a.trim_start_matches("0x").to_uppercase(),
                decimals: 6,
            })
            .collect())
    }
}

pub struct StaticPrices;

#[async_trait]
impl PriceRepository for StaticPrices {
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<HashMap<String, f64>> {
        Ok(addresses.iter().map(|a| (a.clone(), 1.0)).collect())
    }
}

/// Finder returning canned routes and remembering the pools it was offered.
#[derive(Default)]
pub struct ScriptedFinder {
    pub routes: Mutex<Vec<Route>>,
    pub amm_route: Mutex<Option<Route>>,
    pub offered_pools: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl RouteFinder for ScriptedFinder {
    async fn find(
        &self,
        _ctx: &RequestContext,
        params: FindRouteParams<'_>,
    ) -> Result<FoundRoutes> {
        let mut offered: Vec<String> = params.state.pools.keys().cloned().collect();
        offered.sort();
        *self.offered_pools.lock().unwrap() = offered;
        if *self.fail.lock().unwrap() {
            bail!("no path between {} and {}", params.token_in, params.token_out);
        }
        Ok(FoundRoutes {
            routes: self.routes.lock().unwrap().clone(),
            amm_route: self.amm_route.lock().unwrap().clone(),
        })
    }
}

pub fn direct_path(amount_in: u64, pool: &str) -> Path {
    Path {
        amount_in: BigUint::from(amount_in),
        tokens: vec![TOKEN_A.to_string(), TOKEN_C.to_string()],
        pool_addresses: vec![pool.to_string()],
    }
}

/// 1030.6 units of a six-decimal token priced at one dollar.
pub fn params() -> AggregateParams {
    AggregateParams {
        token_in: Token {
            address: TOKEN_A.to_string(),
            decimals: 6,
        },
        token_out: Token {
            address: TOKEN_C.to_string(),
            decimals: 6,
        },
        gas_token: Token {
            address: TOKEN_B.to_string(),
            decimals: 18,
        },
        token_in_price_usd: 1.0,
        token_out_price_usd: 1.0,
        gas_token_price_usd: 2000.0,
        amount_in: BigUint::from(1_030_600_000u64),
        gas_price: 1e9,
        gas_include: true,
        ..Default::default()
    }
}

pub fn cache_config() -> CacheConfig {
    CacheConfig {
        default_ttl: Duration::from_secs(5),
        ttl_by_amount_usd_range: vec![
            CacheRange {
                amount_usd_lower_bound: 0.0,
                ttl: Duration::from_secs(10),
            },
            CacheRange {
                amount_usd_lower_bound: 500.0,
                ttl: Duration::from_secs(12),
            },
        ],
        price_impact_threshold: 0.05,
        shrink_func_name: "decimal".to_string(),
        shrink_decimal_base: 10.0,
        min_amount_in_usd: 0.9,
        ..Default::default()
    }
}

/// Deep pool: negligible price impact for the default request.
pub fn deep_pool(address: &str) -> XykPool {
    XykPool::new(address, TOKEN_A, TOKEN_C, 1_000_000_000_000, 1_000_000_000_000)
}

/// Pool holding almost no output token.
pub fn shallow_pool(address: &str) -> XykPool {
    XykPool::new(address, TOKEN_A, TOKEN_C, 1_000_000_000_000, 1_000_000_000)
}

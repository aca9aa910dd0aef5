// Find-route aggregator
// Loads the best ranked pools for a pair, asks the route finder for
// candidate routes and summarizes the best one against the same pool state
//
// Numan Thabit 2025 Nov

use anyhow::Result;
use async_trait::async_trait;
use num_bigint::BigUint;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use super::{AggregateParams, Aggregator};
use crate::business::amount_in_after_fee;
use crate::config::{AggregatorConfig, AppConfig};
use crate::context::RequestContext;
use crate::errors::RouteError;
use crate::pool::{FindRouteState, PoolManager, PoolManagerExtraData};
use crate::route::{summarize_route, Route, RouteSummaries};

#[async_trait]
pub trait PoolRankRepository: Send + Sync {
    /// Pool ids ranked best first for the pair.
    async fn find_best_pool_ids(
        &self,
        token_in: &str,
        token_out: &str,
        limit: usize,
    ) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<Vec<TokenInfo>>;
}

#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Preferred USD price per token address. Unpriced tokens are absent.
    async fn find_by_addresses(&self, addresses: &[String]) -> Result<HashMap<String, f64>>;
}

/// Everything the route finder searches over.
pub struct FindRouteParams<'a> {
    pub token_in: &'a str,
    pub token_out: &'a str,
    pub amount_in: &'a BigUint,
    pub gas_price: f64,
    pub gas_token_price_usd: f64,
    pub save_gas: bool,
    pub gas_include: bool,
    pub is_path_generator_enabled: bool,
    pub is_hill_climbing_enabled: bool,
    pub state: &'a FindRouteState,
    pub tokens: &'a HashMap<String, TokenInfo>,
    pub prices_usd: &'a HashMap<String, f64>,
}

/// Finder output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundRoutes {
    /// Candidates ranked best first
    pub routes: Vec<Route>,
    /// Best route over AMM pools only, when the finder computed one
    pub amm_route: Option<Route>,
}

/// Path search engine.
#[async_trait]
pub trait RouteFinder: Send + Sync {
    async fn find(&self, ctx: &RequestContext, params: FindRouteParams<'_>) -> Result<FoundRoutes>;
}

pub struct FindRouteAggregator {
    pool_rank: Arc<dyn PoolRankRepository>,
    tokens: Arc<dyn TokenRepository>,
    prices: Arc<dyn PriceRepository>,
    pool_manager: Arc<dyn PoolManager>,
    finder: Arc<dyn RouteFinder>,
    config: RwLock<AggregatorConfig>,
}

impl FindRouteAggregator {
    pub fn new(
        pool_rank: Arc<dyn PoolRankRepository>,
        tokens: Arc<dyn TokenRepository>,
        prices: Arc<dyn PriceRepository>,
        pool_manager: Arc<dyn PoolManager>,
        finder: Arc<dyn RouteFinder>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            pool_rank,
            tokens,
            prices,
            pool_manager,
            finder,
            config: RwLock::new(config),
        }
    }

    async fn load_state(
        &self,
        ctx: &RequestContext,
        params: &AggregateParams,
    ) -> Result<FindRouteState, RouteError> {
        let limit = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .best_pools_limit;

        let state_root = ctx
            .run(self.pool_manager.latest_state_root())
            .await?
            .map_err(RouteError::PoolState)?;

        let best_pool_ids = ctx
            .run(self.pool_rank.find_best_pool_ids(
                &params.token_in.address,
                &params.token_out.address,
                limit,
            ))
            .await?
            .map_err(RouteError::Upstream)?;
        let pool_ids: Vec<String> = best_pool_ids
            .into_iter()
            .filter(|id| !params.excluded_pools.contains(id))
            .collect();

        let extra = PoolManagerExtraData {
            limit_order_allowed_senders: params.limit_order_allowed_senders.clone(),
        };
        ctx.run(self.pool_manager.get_state_by_pool_addresses(
            &pool_ids,
            &params.sources,
            state_root,
            &extra,
        ))
        .await?
        .map_err(RouteError::PoolState)
    }
}

/// Every token touched by the pool set plus the request's own tokens.
fn collect_token_addresses(state: &FindRouteState, params: &AggregateParams) -> Vec<String> {
    let mut addresses: BTreeSet<String> = state
        .pools
        .values()
        .flat_map(|pool| pool.tokens().iter().cloned())
        .collect();
    for token in [&params.token_in, &params.token_out, &params.gas_token] {
        if !token.address.is_empty() {
            addresses.insert(token.address.clone());
        }
    }
    addresses.into_iter().collect()
}

#[async_trait]
impl Aggregator for FindRouteAggregator {
    #[tracing::instrument(skip_all, fields(request_id = %ctx.request_id))]
    async fn aggregate(
        &self,
        ctx: &RequestContext,
        params: &AggregateParams,
    ) -> Result<RouteSummaries, RouteError> {
        let state = self.load_state(ctx, params).await?;
        if state.pools.is_empty() {
            return Err(RouteError::PoolSetEmpty);
        }

        let addresses = collect_token_addresses(&state, params);
        let tokens: HashMap<String, TokenInfo> = ctx
            .run(self.tokens.find_by_addresses(&addresses))
            .await?
            .map_err(RouteError::Upstream)?
            .into_iter()
            .map(|t| (t.address.clone(), t))
            .collect();
        let prices_usd = ctx
            .run(self.prices.find_by_addresses(&addresses))
            .await?
            .map_err(RouteError::Upstream)?;

        let amount_in = amount_in_after_fee(&params.amount_in, &params.extra_fee)?;
        let find_params = FindRouteParams {
            token_in: &params.token_in.address,
            token_out: &params.token_out.address,
            amount_in: &amount_in,
            gas_price: params.gas_price,
            gas_token_price_usd: params.gas_token_price_usd,
            save_gas: params.save_gas,
            gas_include: params.gas_include,
            is_path_generator_enabled: params.is_path_generator_enabled,
            is_hill_climbing_enabled: params.is_hill_climbing_enabled,
            state: &state,
            tokens: &tokens,
            prices_usd: &prices_usd,
        };

        let found = ctx
            .run(self.finder.find(ctx, find_params))
            .await?
            .map_err(|err| RouteError::RouteNotFound(format!("find route failed: {err:#}")))?;
        let best = found
            .routes
            .into_iter()
            .find(|route| !route.paths.is_empty())
            .ok_or_else(|| RouteError::RouteNotFound("finder returned no route".to_string()))?;

        debug!(
            pools = state.pools.len(),
            paths = best.paths.len(),
            "summarizing found route"
        );
        let best = summarize_route(&best, params, &state)?;

        let amm_best = match found.amm_route.filter(|route| !route.paths.is_empty()) {
            Some(route) => match summarize_route(&route, params, &state) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(error = %err, "summarize amm route failed");
                    None
                }
            },
            None => None,
        };
        Ok(RouteSummaries { best, amm_best })
    }

    fn apply_config(&self, config: &AppConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config.aggregator.clone();
    }
}

// Route summarizer
// Replays a route swap by swap against fresh pool state and prices the result.
// Pools are mutated only through a request-local copy-on-write bucket
//
// Numan Thabit 2025 Nov

use std::sync::Arc;
use tracing::debug;

use crate::aggregator::AggregateParams;
use crate::business::{
    amount_in_after_fee, amount_out_after_fee, calc_amount_usd, calc_gas_usd, distribute_amount,
    BASE_GAS,
};
use crate::context::RequestContext;
use crate::errors::RouteError;
use crate::metrics::{self, ROUTE_SUMMARIZE_LATENCY};
use crate::pool::{
    calc_amount_out, FindRouteState, PoolBucket, PoolManager, PoolManagerExtraData, TokenAmount,
    UpdateBalanceParams,
};
use crate::route::simple::SimpleRoute;
use crate::route::summary::{Path, Route, RouteSummary, Swap};

pub struct RouteSummarizer {
    pool_manager: Arc<dyn PoolManager>,
}

impl RouteSummarizer {
    pub fn new(pool_manager: Arc<dyn PoolManager>) -> Self {
        Self { pool_manager }
    }

    /// Re-price a cached route against the latest pool state.
    pub async fn summarize_simple_route(
        &self,
        ctx: &RequestContext,
        route: &SimpleRoute,
        params: &AggregateParams,
    ) -> Result<RouteSummary, RouteError> {
        let _timer = ROUTE_SUMMARIZE_LATENCY.start_timer();

        if route.paths.is_empty() || route.distributions.len() != route.paths.len() {
            return Err(RouteError::invalid_swap(format!(
                "route has {} paths and {} distributions",
                route.paths.len(),
                route.distributions.len()
            )));
        }

        let addresses = route.pool_addresses();
        let state_root = ctx
            .run(self.pool_manager.latest_state_root())
            .await?
            .map_err(RouteError::PoolState)?;
        let extra = PoolManagerExtraData {
            limit_order_allowed_senders: params.limit_order_allowed_senders.clone(),
        };
        let state = ctx
            .run(self.pool_manager.get_state_by_pool_addresses(
                &addresses,
                &params.sources,
                state_root,
                &extra,
            ))
            .await?
            .map_err(RouteError::PoolState)?;

        if state.pools.len() < addresses.len() {
            return Err(RouteError::invalid_swap(format!(
                "could not get all pools from pool manager: {} of {}",
                state.pools.len(),
                addresses.len()
            )));
        }

        let amount_in = amount_in_after_fee(&params.amount_in, &params.extra_fee)?;
        let amounts = distribute_amount(&amount_in, &route.distributions);

        let mut paths = Vec::with_capacity(route.paths.len());
        for (swaps, amount) in route.paths.iter().zip(amounts) {
            if swaps.is_empty() {
                return Err(RouteError::invalid_swap("route contains an empty path"));
            }
            let mut tokens = Vec::with_capacity(swaps.len() + 1);
            tokens.push(params.token_in.address.clone());
            tokens.extend(swaps.iter().map(|s| s.token_out_address.clone()));
            paths.push(Path {
                amount_in: amount,
                tokens,
                pool_addresses: swaps.iter().map(|s| s.pool_address.clone()).collect(),
            });
        }

        debug!(
            request_id = %ctx.request_id,
            pools = addresses.len(),
            paths = paths.len(),
            "replaying cached route"
        );
        summarize_route(&Route { paths }, params, &state)
    }
}

/// Walk every path of `route` through a fresh `PoolBucket` over `state` and
/// assemble the priced summary. Any unreplayable swap rejects the whole route.
pub fn summarize_route(
    route: &Route,
    params: &AggregateParams,
    state: &FindRouteState,
) -> Result<RouteSummary, RouteError> {
    let mut bucket = PoolBucket::new(state.pools.clone());
    let mut swap_limits = state.swap_limits.clone();

    let mut amount_out = num_bigint::BigUint::default();
    let mut gas = BASE_GAS;
    let mut summary_route = Vec::with_capacity(route.paths.len());

    for path in &route.paths {
        if !path.is_well_formed() {
            return Err(RouteError::invalid_swap(format!(
                "path has {} tokens for {} pools",
                path.tokens.len(),
                path.pool_addresses.len()
            )));
        }

        let mut token_amount_in = TokenAmount::new(path.tokens[0].clone(), path.amount_in.clone());
        let mut swaps = Vec::with_capacity(path.pool_addresses.len());

        for (idx, pool_address) in path.pool_addresses.iter().enumerate() {
            let token_out = &path.tokens[idx + 1];

            let pool = bucket
                .get_pool(pool_address)
                .ok_or_else(|| RouteError::invalid_swap(format!("pool {pool_address} not found")))?;
            let pool_type = pool.pool_type().to_string();
            let result = calc_amount_out(
                pool,
                &token_amount_in,
                token_out,
                swap_limits.get(&pool_type),
            )
            .map_err(|err| RouteError::invalid_swap(format!("pool {pool_address}: {err:#}")))?;
            if !result.is_valid() {
                return Err(RouteError::invalid_swap(format!(
                    "pool {pool_address} returned no output"
                )));
            }
            let exchange = pool.exchange().to_string();
            let pool_extra = pool.meta_info(&token_amount_in.token, token_out);

            let clone = bucket
                .clone_pool(pool_address)
                .ok_or_else(|| RouteError::invalid_swap(format!("pool {pool_address} not found")))?;
            clone.update_balance(UpdateBalanceParams {
                token_amount_in: &token_amount_in,
                token_amount_out: &result.token_amount_out,
                fee: &result.fee,
                swap_info: &result.swap_info,
                swap_limit: swap_limits.get_mut(&pool_type),
            });

            gas += result.gas;
            swaps.push(Swap {
                pool: pool_address.clone(),
                token_in: token_amount_in.token.clone(),
                token_out: token_out.clone(),
                swap_amount: token_amount_in.amount.clone(),
                amount_out: result.token_amount_out.amount.clone(),
                exchange,
                pool_type,
                pool_extra,
                extra: result.swap_info,
            });
            token_amount_in = result.token_amount_out;
        }

        amount_out += token_amount_in.amount;
        summary_route.push(swaps);
    }

    let amount_out = amount_out_after_fee(&amount_out, &params.extra_fee)?;

    let summary = RouteSummary {
        token_in: params.token_in.address.clone(),
        amount_in: params.amount_in.clone(),
        amount_in_usd: calc_amount_usd(
            &params.amount_in,
            params.token_in.decimals,
            params.token_in_price_usd,
        ),
        token_out: params.token_out.address.clone(),
        amount_out_usd: calc_amount_usd(
            &amount_out,
            params.token_out.decimals,
            params.token_out_price_usd,
        ),
        amount_out,
        gas,
        gas_price: params.gas_price,
        gas_usd: calc_gas_usd(params.gas_price, gas, params.gas_token_price_usd),
        extra_fee: params.extra_fee.clone(),
        route: summary_route,
    };
    metrics::record_dex_hits(summary.exchanges());
    Ok(summary)
}

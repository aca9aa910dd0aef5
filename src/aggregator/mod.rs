// Aggregator module
// Request parameters and the aggregation capability shared by the
// find-route aggregator and the caching decorator in front of it
//
// Numan Thabit 2025 Nov

pub mod cache;
pub mod find_route;

use async_trait::async_trait;
use num_bigint::BigUint;
use std::collections::BTreeSet;

use crate::business::ExtraFee;
use crate::config::AppConfig;
use crate::context::RequestContext;
use crate::errors::RouteError;
use crate::route::RouteSummaries;

pub use cache::CachingAggregator;
pub use find_route::{
    FindRouteAggregator, FindRouteParams, FoundRoutes, PoolRankRepository, PriceRepository,
    RouteFinder, TokenInfo, TokenRepository,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub address: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateParams {
    pub token_in: Token,
    pub token_out: Token,
    pub gas_token: Token,
    pub token_in_price_usd: f64,
    pub token_out_price_usd: f64,
    pub gas_token_price_usd: f64,
    pub amount_in: BigUint,
    /// Liquidity sources allowed for the request
    pub sources: Vec<String>,
    pub save_gas: bool,
    pub gas_include: bool,
    /// Wei per gas unit
    pub gas_price: f64,
    pub extra_fee: ExtraFee,
    pub is_path_generator_enabled: bool,
    pub is_hill_climbing_enabled: bool,
    pub excluded_pools: BTreeSet<String>,
    pub limit_order_allowed_senders: String,
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn aggregate(
        &self,
        ctx: &RequestContext,
        params: &AggregateParams,
    ) -> Result<RouteSummaries, RouteError>;

    /// Hot reload hook.
    fn apply_config(&self, config: &AppConfig);
}

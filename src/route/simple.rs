// Simple route
// Amount-free projection of a route summary, the only thing persisted in
// the route cache
//
// Numan Thabit 2025 Nov

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::business::BPS_DENOMINATOR;
use crate::route::summary::RouteSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleSwap {
    pub pool_address: String,
    pub token_in_address: String,
    pub token_out_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRoute {
    /// Basis points per path, summing to 10000
    pub distributions: Vec<u64>,
    pub paths: Vec<Vec<SimpleSwap>>,
}

/// Payload stored under a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRoute {
    pub best_route: SimpleRoute,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amm_route: Option<SimpleRoute>,
}

impl SimpleRoute {
    /// Drop amounts and pool state, keeping each path's share of the routed
    /// amount in basis points. The last path takes the rounding remainder.
    pub fn from_summary(summary: &RouteSummary) -> Self {
        let path_amounts: Vec<BigUint> = summary
            .route
            .iter()
            .map(|path| path.first().map(|s| s.swap_amount.clone()).unwrap_or_default())
            .collect();
        let total: BigUint = path_amounts.iter().sum();

        let mut distributions = Vec::with_capacity(path_amounts.len());
        let mut allocated = 0u64;
        for (idx, amount) in path_amounts.iter().enumerate() {
            if idx + 1 == path_amounts.len() {
                distributions.push(BPS_DENOMINATOR.saturating_sub(allocated));
                break;
            }
            let bps = if total.is_zero() {
                0
            } else {
                (amount * BPS_DENOMINATOR / &total).to_u64().unwrap_or(0)
            };
            allocated += bps;
            distributions.push(bps);
        }

        let paths = summary
            .route
            .iter()
            .map(|path| {
                path.iter()
                    .map(|swap| SimpleSwap {
                        pool_address: swap.pool.clone(),
                        token_in_address: swap.token_in.clone(),
                        token_out_address: swap.token_out.clone(),
                    })
                    .collect()
            })
            .collect();

        Self {
            distributions,
            paths,
        }
    }

    /// Pools referenced by the route, de-duplicated in first-seen order.
    pub fn pool_addresses(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.paths
            .iter()
            .flatten()
            .filter(|swap| seen.insert(swap.pool_address.as_str()))
            .map(|swap| swap.pool_address.clone())
            .collect()
    }
}

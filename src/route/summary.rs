// Route value objects
// The abstract route produced by the finder and the fully priced summary
// obtained by replaying it against pool state
//
// Numan Thabit 2025 Nov

use num_bigint::BigUint;

use crate::business::ExtraFee;

/// One path of a finder route: `tokens[i] -> tokens[i + 1]` through `pool_addresses[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub amount_in: BigUint,
    pub tokens: Vec<String>,
    pub pool_addresses: Vec<String>,
}

impl Path {
    pub fn is_well_formed(&self) -> bool {
        !self.pool_addresses.is_empty() && self.tokens.len() == self.pool_addresses.len() + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub paths: Vec<Path>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Swap {
    pub pool: String,
    pub token_in: String,
    pub token_out: String,
    pub swap_amount: BigUint,
    pub amount_out: BigUint,
    pub exchange: String,
    pub pool_type: String,
    pub pool_extra: serde_json::Value,
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub token_in: String,
    pub amount_in: BigUint,
    pub amount_in_usd: f64,
    pub token_out: String,
    pub amount_out: BigUint,
    pub amount_out_usd: f64,
    pub gas: u64,
    pub gas_price: f64,
    pub gas_usd: f64,
    pub extra_fee: ExtraFee,
    pub route: Vec<Vec<Swap>>,
}

/// Best route for a request, plus the best route restricted to AMM pools
/// when one was found. Fee finalization compares the two.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummaries {
    pub best: RouteSummary,
    pub amm_best: Option<RouteSummary>,
}

impl RouteSummary {
    /// `(in - out) / in` in USD. Negative infinity when the input has no USD value.
    pub fn price_impact(&self) -> f64 {
        if self.amount_in_usd <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (self.amount_in_usd - self.amount_out_usd) / self.amount_in_usd
    }

    /// True when some path does not run from `token_in` all the way to `token_out`.
    pub fn is_merge_swap_route(&self, token_in: &str, token_out: &str) -> bool {
        self.route.iter().any(|path| match (path.first(), path.last()) {
            (Some(first), Some(last)) => first.token_in != token_in || last.token_out != token_out,
            _ => true,
        })
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &str> {
        self.route
            .iter()
            .flatten()
            .map(|swap| swap.exchange.as_str())
    }
}

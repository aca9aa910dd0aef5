// Pool simulator capability
// Every liquidity source variant implements `PoolSimulator`; the cache layer
// only ever talks to pools through this trait and never assumes a concrete type
//
// Numan Thabit 2025 Nov

use anyhow::{anyhow, bail, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    pub token: String,
    pub amount: BigUint,
}

impl TokenAmount {
    pub fn new(token: impl Into<String>, amount: BigUint) -> Self {
        Self {
            token: token.into(),
            amount,
        }
    }
}

pub struct CalcAmountOutParams<'a> {
    pub token_amount_in: &'a TokenAmount,
    pub token_out: &'a str,
    pub limit: Option<&'a SwapLimit>,
}

#[derive(Debug, Clone)]
pub struct CalcAmountOutResult {
    pub token_amount_out: TokenAmount,
    pub fee: TokenAmount,
    pub gas: u64,
    /// Pool specific data needed to replay the swap on-chain
    pub swap_info: serde_json::Value,
}

impl CalcAmountOutResult {
    pub fn is_valid(&self) -> bool {
        !self.token_amount_out.amount.is_zero()
    }
}

pub struct UpdateBalanceParams<'a> {
    pub token_amount_in: &'a TokenAmount,
    pub token_amount_out: &'a TokenAmount,
    pub fee: &'a TokenAmount,
    pub swap_info: &'a serde_json::Value,
    pub swap_limit: Option<&'a mut SwapLimit>,
}

pub trait PoolSimulator: Send + Sync + fmt::Debug {
    fn address(&self) -> &str;

    fn exchange(&self) -> &str;

    fn pool_type(&self) -> &str;

    fn tokens(&self) -> &[String];

    fn calc_amount_out(&self, params: CalcAmountOutParams<'_>) -> Result<CalcAmountOutResult>;

    fn update_balance(&mut self, params: UpdateBalanceParams<'_>);

    /// Extra data attached to each summarized swap
    fn meta_info(&self, _token_in: &str, _token_out: &str) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Deep copy used by `PoolBucket` before a balance update.
    fn clone_box(&self) -> Box<dyn PoolSimulator>;
}

/// Simulate a swap, turning a panicking simulator into an error.
pub fn calc_amount_out(
    pool: &dyn PoolSimulator,
    token_amount_in: &TokenAmount,
    token_out: &str,
    limit: Option<&SwapLimit>,
) -> Result<CalcAmountOutResult> {
    let result = catch_unwind(AssertUnwindSafe(|| {
        pool.calc_amount_out(CalcAmountOutParams {
            token_amount_in,
            token_out,
            limit,
        })
    }))
    .map_err(|_| anyhow!("pool {} panicked while calculating amount out", pool.address()))??;

    if result.token_amount_out.token != token_out {
        bail!(
            "pool {} returned token {} instead of {}",
            pool.address(),
            result.token_amount_out.token,
            token_out
        );
    }
    Ok(result)
}

/// Per pool-type inventory bounding how much a market maker can honour.
#[derive(Debug, Clone, Default)]
pub struct SwapLimit {
    kind: String,
    limits: HashMap<String, BigUint>,
}

impl SwapLimit {
    pub fn new(kind: impl Into<String>, limits: HashMap<String, BigUint>) -> Self {
        Self {
            kind: kind.into(),
            limits,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get_limit(&self, token: &str) -> BigUint {
        self.limits.get(token).cloned().unwrap_or_default()
    }

    pub fn update_limit(
        &mut self,
        decrease_token: &str,
        decrease_delta: &BigUint,
        increase_token: &str,
        increase_delta: &BigUint,
    ) -> Result<()> {
        let current = self.get_limit(decrease_token);
        if &current < decrease_delta {
            bail!(
                "not enough {} inventory: have {}, need {}",
                decrease_token,
                current,
                decrease_delta
            );
        }
        self.limits
            .insert(decrease_token.to_string(), current - decrease_delta);
        *self.limits.entry(increase_token.to_string()).or_default() += increase_delta;
        Ok(())
    }
}

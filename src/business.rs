// Business arithmetic module
// Token decimal conversion, USD valuation, path amount distribution,
// extra fee charging and gas accounting used by key generation and summarization
//
// Numan Thabit 2025 Nov

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::errors::RouteError;

/// Gas paid by the router itself regardless of the route shape.
pub const BASE_GAS: u64 = 125_000;

pub const BPS_DENOMINATOR: u64 = 10_000;

const FLOAT64_EPSILON: f64 = 1e-9;

const NATIVE_DECIMALS: i32 = 18;

pub fn float64_almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT64_EPSILON
}

/// `amount / 10^decimals`, correctly rounded to the nearest f64.
pub fn amount_without_decimals(amount: &BigUint, decimals: u8) -> f64 {
    let digits = amount.to_str_radix(10);
    let decimals = decimals as usize;
    let text = if decimals == 0 {
        digits
    } else if digits.len() > decimals {
        let (int_part, frac_part) = digits.split_at(digits.len() - decimals);
        format!("{int_part}.{frac_part}")
    } else {
        format!("0.{}{}", "0".repeat(decimals - digits.len()), digits)
    };
    text.parse::<f64>().unwrap_or(f64::INFINITY)
}

pub fn calc_amount_usd(amount: &BigUint, decimals: u8, price_usd: f64) -> f64 {
    amount_without_decimals(amount, decimals) * price_usd
}

/// Gas cost in USD for `gas` units at `gas_price` wei, the native token
/// priced at `gas_token_price_usd`.
pub fn calc_gas_usd(gas_price: f64, gas: u64, gas_token_price_usd: f64) -> f64 {
    gas_price * gas as f64 / 10f64.powi(NATIVE_DECIMALS) * gas_token_price_usd
}

/// Split `amount` across paths by basis points. Every path but the last gets
/// `floor(amount * bps / 10000)`; the last one takes whatever is left so the
/// parts always add up to `amount`.
pub fn distribute_amount(amount: &BigUint, distributions: &[u64]) -> Vec<BigUint> {
    let Some(last) = distributions.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut allocated = BigUint::zero();
    let mut amounts = Vec::with_capacity(distributions.len());
    for bps in &distributions[..last] {
        let part = amount * BigUint::from(*bps) / BigUint::from(BPS_DENOMINATOR);
        allocated += &part;
        amounts.push(part);
    }

    amounts.push(if &allocated >= amount {
        BigUint::zero()
    } else {
        amount - &allocated
    });
    amounts
}

/// Parse an integer amount, accepting plain digits or `<digits>e<exp>`.
pub fn parse_amount(raw: &str) -> Option<BigUint> {
    let raw = raw.trim();
    match raw.split_once(['e', 'E']) {
        None => raw.parse::<BigUint>().ok(),
        Some((mantissa, exp)) => {
            let exp: u32 = exp.parse().ok()?;
            let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
            let frac_len = frac_part.len() as u32;
            if frac_len > exp {
                return None;
            }
            let digits: BigUint = format!("{int_part}{frac_part}").parse().ok()?;
            Some(digits * BigUint::from(10u32).pow(exp - frac_len))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeFeeBy {
    #[default]
    None,
    CurrencyIn,
    CurrencyOut,
}

/// Integrator fee taken on top of the swap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFee {
    pub fee_amount: BigUint,
    pub charge_fee_by: ChargeFeeBy,
    pub is_in_bps: bool,
    pub fee_receiver: String,
}

impl ExtraFee {
    pub fn is_charge_fee_by_currency_in(&self) -> bool {
        self.charge_fee_by == ChargeFeeBy::CurrencyIn && !self.fee_amount.is_zero()
    }

    pub fn is_charge_fee_by_currency_out(&self) -> bool {
        self.charge_fee_by == ChargeFeeBy::CurrencyOut && !self.fee_amount.is_zero()
    }

    /// Fee taken from `amount`, either a fixed amount or `amount * bps / 10000`.
    pub fn actual_fee(&self, amount: &BigUint) -> BigUint {
        if self.is_in_bps {
            amount * &self.fee_amount / BigUint::from(BPS_DENOMINATOR)
        } else {
            self.fee_amount.clone()
        }
    }
}

/// Amount actually routed once a currency-in fee is deducted.
pub fn amount_in_after_fee(amount_in: &BigUint, fee: &ExtraFee) -> Result<BigUint, RouteError> {
    if !fee.is_charge_fee_by_currency_in() {
        return Ok(amount_in.clone());
    }
    let charged = fee.actual_fee(amount_in);
    if &charged > amount_in {
        return Err(RouteError::FeeAmountIsGreaterThanAmountIn);
    }
    Ok(amount_in - charged)
}

/// Amount received by the user once a currency-out fee is deducted.
pub fn amount_out_after_fee(amount_out: &BigUint, fee: &ExtraFee) -> Result<BigUint, RouteError> {
    if !fee.is_charge_fee_by_currency_out() {
        return Ok(amount_out.clone());
    }
    let charged = fee.actual_fee(amount_out);
    if &charged > amount_out {
        return Err(RouteError::FeeAmountIsGreaterThanAmountOut);
    }
    Ok(amount_out - charged)
}

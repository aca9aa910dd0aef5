// Amount shrink functions
// Collapse nearby amounts onto one canonical bucket value so that
// similar requests share a cache key
//
// Numan Thabit 2025 Nov

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::RouteError;

pub type ShrinkFunc = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkFuncName {
    Round,
    Pow,
    Decimal,
    Logarithm,
}

impl FromStr for ShrinkFuncName {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round" => Ok(Self::Round),
            "pow" => Ok(Self::Pow),
            "decimal" => Ok(Self::Decimal),
            "logarithm" => Ok(Self::Logarithm),
            other => Err(RouteError::InvalidShrinkFunc {
                name: other.to_string(),
                reason: "unknown shrink function".to_string(),
            }),
        }
    }
}

impl fmt::Display for ShrinkFuncName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Round => "round",
            Self::Pow => "pow",
            Self::Decimal => "decimal",
            Self::Logarithm => "logarithm",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShrinkParams {
    pub pow_exp: f64,
    pub decimal_base: f64,
    pub log_percent: f64,
}

pub fn shrink_func_factory(
    name: ShrinkFuncName,
    params: ShrinkParams,
) -> Result<ShrinkFunc, RouteError> {
    match name {
        ShrinkFuncName::Round => Ok(Arc::new(|v: f64| v.round_ties_even())),
        ShrinkFuncName::Pow => {
            let exp = params.pow_exp;
            Ok(Arc::new(move |v: f64| v.powf(exp)))
        }
        ShrinkFuncName::Decimal => {
            let base = checked_base(name, params.decimal_base)?;
            Ok(Arc::new(move |v: f64| shrink_decimal(v, base)))
        }
        ShrinkFuncName::Logarithm => {
            let percent = checked_base(name, params.log_percent)?;
            Ok(Arc::new(move |v: f64| shrink_logarithm(v, percent)))
        }
    }
}

/// Build from a configured name, e.g. `"decimal"`.
pub fn shrink_func_by_name(name: &str, params: ShrinkParams) -> Result<ShrinkFunc, RouteError> {
    shrink_func_factory(name.parse()?, params)
}

fn checked_base(name: ShrinkFuncName, base: f64) -> Result<f64, RouteError> {
    if !base.is_finite() || base <= 0.0 || base == 1.0 {
        return Err(RouteError::InvalidShrinkFunc {
            name: name.to_string(),
            reason: format!("base must be positive and not 1, got {base}"),
        });
    }
    Ok(base)
}

/// Round to the nearest multiple of the largest power of `base` not above `v`.
fn shrink_decimal(v: f64, base: f64) -> f64 {
    if v <= 0.0 || !v.is_finite() {
        return v.max(0.0);
    }
    let level = base.powf((v.ln() / base.ln()).floor());
    level * (v / level).round_ties_even()
}

fn shrink_logarithm(v: f64, percent: f64) -> f64 {
    if v <= 0.0 || !v.is_finite() {
        return v.max(0.0);
    }
    percent.powf((v.ln() / percent.ln()).round_ties_even())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(base: f64) -> ShrinkFunc {
        shrink_func_factory(
            ShrinkFuncName::Decimal,
            ShrinkParams {
                decimal_base: base,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn logarithm(percent: f64) -> ShrinkFunc {
        shrink_func_factory(
            ShrinkFuncName::Logarithm,
            ShrinkParams {
                log_percent: percent,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn decimal_rounds_to_leading_power() {
        let f = decimal(10.0);
        assert_eq!(f(100.0), 100.0);
        assert_eq!(f(136.0), 100.0);
        assert_eq!(f(35.9), 40.0);
        assert_eq!(f(3.36), 3.0);
        assert_eq!(f(1030.6), 1000.0);
        assert_eq!(f(1.59), 2.0);
        assert_eq!(f(0.0), 0.0);
        assert_eq!(f(-4.0), 0.0);
    }

    #[test]
    fn logarithm_steps_geometrically() {
        assert_eq!(format!("{:.0}", logarithm(1.1)(2000.0)), "2048");
        assert_eq!(format!("{:.0}", logarithm(1.3)(2000.0)), "2015");
        assert_eq!(format!("{:.0}", logarithm(1.5)(2000.0)), "2217");
        assert_eq!(logarithm(1.5)(0.0), 0.0);
    }

    #[test]
    fn round_and_pow() {
        let round = shrink_func_by_name("round", ShrinkParams::default()).unwrap();
        assert_eq!(round(2001.0), 2001.0);
        assert_eq!(round(1049.6), 1050.0);

        let pow = shrink_func_by_name(
            "pow",
            ShrinkParams {
                pow_exp: 2.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(pow(3.0), 9.0);
    }

    #[test]
    fn rejects_unknown_name_and_bad_base() {
        assert!(matches!(
            shrink_func_by_name("shrink_decimal_base", ShrinkParams::default()),
            Err(RouteError::InvalidShrinkFunc { .. })
        ));
        assert!(shrink_func_factory(ShrinkFuncName::Decimal, ShrinkParams::default()).is_err());
        assert!(shrink_func_factory(
            ShrinkFuncName::Logarithm,
            ShrinkParams {
                log_percent: 1.0,
                ..Default::default()
            }
        )
        .is_err());
    }
}

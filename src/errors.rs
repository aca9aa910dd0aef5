// Error types and error handling module
// This file defines the error taxonomy shared by key generation,
// route summarization, the cache repositories and the aggregators
//
// Numan Thabit 2025 Nov

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("token in has no price")]
    NoTokenInPrice,
    #[error("token decimal has not been found")]
    MissingTokenDecimals,
    #[error("different between shrunk value and amount in without decimal is above threshold")]
    ShrunkAmountAboveThreshold,
    #[error("invalid shrink function {name}: {reason}")]
    InvalidShrinkFunc { name: String, reason: String },
    #[error("invalid swap: {0}")]
    InvalidSwap(String),
    #[error("fee amount is greater than amount out")]
    FeeAmountIsGreaterThanAmountOut,
    #[error("fee amount is greater than amount in")]
    FeeAmountIsGreaterThanAmountIn,
    #[error("price impact {0} is greater than threshold")]
    PriceImpactIsGreaterThanThreshold(f64),
    #[error("pool set is empty")]
    PoolSetEmpty,
    #[error("route not found: {0}")]
    RouteNotFound(String),
    #[error("pool state error: {0:#}")]
    PoolState(anyhow::Error),
    #[error("upstream error: {0:#}")]
    Upstream(anyhow::Error),
    #[error("request cancelled")]
    Cancelled,
}

impl RouteError {
    pub fn invalid_swap(msg: impl Into<String>) -> Self {
        Self::InvalidSwap(msg.into())
    }

    /// Replaying the cached route against current state failed; the entry
    /// should be evicted and the request served by a fresh find.
    pub fn is_cache_invalidating(&self) -> bool {
        matches!(
            self,
            Self::InvalidSwap(_) | Self::PriceImpactIsGreaterThanThreshold(_)
        )
    }

    /// The request cannot be served from cache but is otherwise healthy.
    pub fn is_non_cacheable(&self) -> bool {
        matches!(
            self,
            Self::NoTokenInPrice
                | Self::MissingTokenDecimals
                | Self::ShrunkAmountAboveThreshold
                | Self::InvalidShrinkFunc { .. }
        )
    }
}

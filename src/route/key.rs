// Route cache key
// Identifies a cache slot for a token pair, a shrunk amount and the request
// options that change which route is found
//
// Numan Thabit 2025 Nov

use blake2::{Blake2b512, Digest};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheMode {
    /// Exact configured amount
    Point,
    /// Shrunk USD notional
    RangeByUsd,
    /// Shrunk decimal-adjusted token amount
    RangeByAmount,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Point => "point",
            CacheMode::RangeByUsd => "amountInUSD",
            CacheMode::RangeByAmount => "amountIn",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteCacheKey {
    pub token_in: String,
    pub token_out: String,
    pub cache_mode: CacheMode,
    /// Already shrunk, formatted amount
    pub amount_in: String,
    pub save_gas: bool,
    pub gas_include: bool,
    pub dexes: BTreeSet<String>,
    pub is_path_generator_enabled: bool,
    pub is_hill_climbing_enabled: bool,
    pub excluded_pools: BTreeSet<String>,
    /// Request may route through the caller's private limit orders
    pub use_private_limit_order: bool,
}

impl RouteCacheKey {
    /// Canonical text form. Set fields are emitted sorted.
    pub fn canonical(&self, prefix: &str) -> String {
        let join = |set: &BTreeSet<String>| {
            set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
        };
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            prefix,
            self.token_in,
            self.token_out,
            self.cache_mode,
            self.amount_in,
            self.save_gas,
            self.gas_include,
            join(&self.dexes),
            self.is_path_generator_enabled,
            self.is_hill_climbing_enabled,
            join(&self.excluded_pools),
            self.use_private_limit_order,
        )
    }

    /// Stable 64-bit digest of the canonical form.
    pub fn hash(&self, prefix: &str) -> u64 {
        let mut hasher = Blake2b512::new();
        hasher.update(self.canonical(prefix).as_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }

    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.hash(prefix))
    }
}

/// A key plus how long the route stored under it stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteCacheKeyTtl {
    pub key: RouteCacheKey,
    pub ttl: Duration,
}

// Pool state provider
// Serves the simulators and swap limits a route is replayed against
//
// Numan Thabit 2025 Nov

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use super::bucket::PoolSnapshot;
use super::simulator::SwapLimit;

pub type StateRoot = [u8; 32];

/// Pools and per pool-type swap limits for one request.
#[derive(Clone)]
pub struct FindRouteState {
    pub pools: PoolSnapshot,
    /// Keyed by pool type
    pub swap_limits: HashMap<String, SwapLimit>,
}

#[derive(Debug, Clone, Default)]
pub struct PoolManagerExtraData {
    pub limit_order_allowed_senders: String,
}

#[async_trait]
pub trait PoolManager: Send + Sync {
    /// Root of the state the pools are read at; `None` means "latest".
    async fn latest_state_root(&self) -> Result<Option<StateRoot>> {
        Ok(None)
    }

    async fn get_state_by_pool_addresses(
        &self,
        addresses: &[String],
        sources: &[String],
        state_root: Option<StateRoot>,
        extra: &PoolManagerExtraData,
    ) -> Result<FindRouteState>;
}

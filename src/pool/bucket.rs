// Copy-on-write pool view
// A request reads pools from a shared snapshot and only clones the ones it
// mutates, so simulated balance updates never leak into other requests
//
// Numan Thabit 2025 Nov

use std::collections::HashMap;
use std::sync::Arc;

use super::simulator::PoolSimulator;

/// Read-only pool set shared between requests.
pub type PoolSnapshot = Arc<HashMap<String, Arc<dyn PoolSimulator>>>;

pub struct PoolBucket {
    per_request_pools: PoolSnapshot,
    changed_pools: HashMap<String, Box<dyn PoolSimulator>>,
}

impl PoolBucket {
    pub fn new(pools: PoolSnapshot) -> Self {
        Self {
            per_request_pools: pools,
            changed_pools: HashMap::new(),
        }
    }

    /// Current view of a pool: the mutated clone if one exists, else the shared original.
    pub fn get_pool(&self, address: &str) -> Option<&dyn PoolSimulator> {
        if let Some(pool) = self.changed_pools.get(address) {
            return Some(pool.as_ref());
        }
        self.per_request_pools.get(address).map(|pool| pool.as_ref())
    }

    /// Mutable clone of a pool, created on first use. Repeated calls return
    /// the same clone.
    pub fn clone_pool(&mut self, address: &str) -> Option<&mut (dyn PoolSimulator + 'static)> {
        if !self.changed_pools.contains_key(address) {
            let original = self.per_request_pools.get(address)?;
            self.changed_pools
                .insert(address.to_string(), original.clone_box());
        }
        self.changed_pools.get_mut(address).map(|pool| pool.as_mut())
    }

    pub fn is_changed(&self, address: &str) -> bool {
        self.changed_pools.contains_key(address)
    }

    pub fn snapshot(&self) -> &PoolSnapshot {
        &self.per_request_pools
    }
}

// Pool access layer
// Simulator capability, copy-on-write bucket and the pool state provider
//
// Numan Thabit 2025 Nov

pub mod bucket;
pub mod manager;
pub mod simulator;

pub use bucket::{PoolBucket, PoolSnapshot};
pub use manager::{FindRouteState, PoolManager, PoolManagerExtraData, StateRoot};
pub use simulator::{
    calc_amount_out, CalcAmountOutParams, CalcAmountOutResult, PoolSimulator, SwapLimit,
    TokenAmount, UpdateBalanceParams,
};

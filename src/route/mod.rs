// Route module
// Route value objects, cache keys and their generation, shrink functions
// and the summarizer that re-prices routes against pool state
//
// Numan Thabit 2025 Nov

pub mod key;
pub mod key_generator;
pub mod shrink;
pub mod simple;
pub mod summarizer;
pub mod summary;

pub use key::{CacheMode, RouteCacheKey, RouteCacheKeyTtl};
pub use key_generator::RouteKeyGenerator;
pub use shrink::{
    shrink_func_by_name, shrink_func_factory, ShrinkFunc, ShrinkFuncName, ShrinkParams,
};
pub use simple::{CachedRoute, SimpleRoute, SimpleSwap};
pub use summarizer::{summarize_route, RouteSummarizer};
pub use summary::{Path, Route, RouteSummaries, RouteSummary, Swap};

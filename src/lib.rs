// Library root module for aggr-route-cache
// This file defines the public API and module structure of the route cache
// and route summarization layer of a DEX aggregation service
//
// Numan Thabit 2025 Nov

pub mod aggregator;
pub mod business;
pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod pool;
pub mod repository;
pub mod route;
pub mod telemetry;

pub use aggregator::{AggregateParams, Aggregator, CachingAggregator, FindRouteAggregator, Token};
pub use config::AppConfig;
pub use context::RequestContext;
pub use errors::RouteError;

// Route payload codec
// JSON encoding of cached routes stored in the shared cache
//
// Numan Thabit 2025 Nov

use anyhow::{Context, Result};

use crate::route::CachedRoute;

pub fn encode_route(route: &CachedRoute) -> Result<String> {
    serde_json::to_string(route).context("encode cached route")
}

pub fn decode_route(raw: &str) -> Result<CachedRoute> {
    serde_json::from_str(raw).context("decode cached route")
}

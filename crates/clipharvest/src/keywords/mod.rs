//! Rotating keyword pool that drives periodic discovery searches.

pub mod pool;
pub mod store;

pub use pool::{KeywordPool, PoolStats, RotationRequest, RotationResult, SeedReport};
pub use store::{InMemoryKeywordStore, KeywordEntry, KeywordStore};

// this_file: crates/t2p-fontdb/src/lib.rs

//! Font discovery, matching, persisted indexing and script fallback for t2p.

pub mod cache;
pub mod config;
pub mod fallback;
pub mod index;
pub mod matcher;
pub mod resolved;

pub use cache::{FontCache, FontCacheStats};
pub use config::{FontCacheConfig, MatcherKind, CACHE_ENV_VAR};
pub use fallback::{FallbackRule, FallbackTable};
pub use index::{FontIndex, IndexEntry, Quarantine, INDEX_VERSION};
pub use matcher::{FontconfigMatcher, FontdbMatcher, StaticMatcher};
pub use resolved::{AxisRange, LineMetrics, ResolvedFont};

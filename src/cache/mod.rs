//! Load-aware result caching.
//!
//! The underlying resource is one shared artifact with no per-request
//! identity, so the cache is a single timestamped slot. Freshness is decided
//! at read time against a TTL the caller takes from the current load level:
//! at `Normal` the TTL is zero and every lookup misses, under pressure the
//! last result is reused for a second or two.
//!
//! ```rust
//! use quote_gate::cache::ResultCache;
//! use std::time::Duration;
//!
//! let cache = ResultCache::new();
//! cache.store("rows");
//! assert_eq!(cache.lookup(Duration::ZERO), None);
//! assert_eq!(cache.lookup(Duration::from_secs(2)), Some("rows"));
//! ```

mod slot;

pub use slot::{CacheStats, ResultCache};

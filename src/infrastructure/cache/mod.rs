//! Caching layer for fast redirect lookups.
//!
//! [`ResolutionCache`] keeps the data needed to serve a redirect in process
//! memory, evicting entries that go unused for longer than the TTL.

mod resolution_cache;

pub use resolution_cache::{CacheEntry, DEFAULT_TTL, ResolutionCache};

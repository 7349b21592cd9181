//! In-memory caching for slowly-changing reference data.
//!
//! Entries carry their own expiry. A read after expiry is a miss, and the stale
//! entry stays in place until the next `put` for the same key replaces it.

mod ttl;

pub use ttl::{TtlCache, TtlCell};

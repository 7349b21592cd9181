//! Rate-limited, caching, retrying access to the Linear issue tracker.

pub mod cache;
pub mod config;
pub mod linear;
pub mod logging;
pub mod resilience;

//! In-process response cache for read endpoints.
//!
//! Two pieces compose:
//!
//! - [`CacheStore`]: key → (payload, created-at, TTL) table. Stale entries are
//!   evicted when a read finds them; an optional [`spawn_sweeper`] task purges
//!   entries nobody reads.
//! - [`ResponseCache`]: middleware that keys each request by path and raw query
//!   string, answers hits from the store, and on a miss wraps the request's JSON
//!   emission so the handler's payload is stored before it is sent.
//!
//! The store is built once at start-up and shared by `Arc`; nothing here is
//! global, so every test can use a fresh store.

pub mod interceptor;
pub mod store;

pub use interceptor::{ResponseCache, cache_key};
pub use store::{CacheStore, DEFAULT_TTL, spawn_sweeper};

//! # movie-catalog
//!
//! A movie catalog HTTP backend with an in-process response cache.
//!
//! The listing endpoints sit behind [`cache::ResponseCache`], which keys each
//! request by its path and raw query string. A hit is answered from memory;
//! a miss runs the handler and keeps a copy of the JSON payload it emits for
//! the configured TTL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use movie_catalog::cache::{CacheStore, ResponseCache};
//! use movie_catalog::catalog::{self, Catalog, MovieStore};
//! use movie_catalog::metadata::Unconfigured;
//! use movie_catalog::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(Catalog::new(MovieStore::new(), Arc::new(Unconfigured)));
//!     let cache = ResponseCache::new(Arc::new(CacheStore::with_default_ttl()));
//!     let router = Arc::new(catalog::router(catalog, cache));
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server.serve(router, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod http;
pub mod metadata;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};

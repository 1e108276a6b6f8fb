//! Cross-origin policy for browser clients of the catalog.

mod cors;

pub use cors::CorsMiddleware;

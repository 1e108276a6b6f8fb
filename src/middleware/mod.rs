//! Middleware pipeline: composable before/after request handler logic.
//!
//! Each middleware wraps the next layer and may inspect the request,
//! short-circuit with its own response, decorate the downstream response,
//! or wrap the request's emission function (see [`Context::wrap_emitter`]).
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining chain; the route handler sits at the end.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`LoggerMiddleware`]: request/response logger.

use std::{future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;

use crate::{Response, StatusCode, context::Context, router::Handler};

/// A cursor into the remaining middleware chain for a single request.
///
/// Calling [`Next::run`] invokes the next middleware. Once the middleware are
/// exhausted the endpoint (the matched route handler) runs; with no endpoint
/// a fallback `500` is returned.
///
/// # Examples
///
/// ```rust,no_run
/// use std::pin::Pin;
/// use movie_catalog::{Response, context::Context, middleware::{Middleware, Next}};
///
/// struct PassThrough;
///
/// impl Middleware for PassThrough {
///     fn handle(
///         &self,
///         ctx: Context,
///         next: Next,
///     ) -> Pin<Box<dyn std::future::Future<Output = Response> + Send>> {
///         Box::pin(async move { next.run(ctx).await })
///     }
/// }
/// ```
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    endpoint: Option<Handler>,
    index: usize,
}

/// A type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use movie_catalog::middleware::{LoggerMiddleware, from_middleware};
///
/// let handler = from_middleware(Arc::new(LoggerMiddleware));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

impl Next {
    /// Creates a cursor at the start of `middlewares` with no endpoint.
    pub fn new(middlewares: impl Into<Arc<[MiddlewareHandler]>>) -> Self {
        Self {
            middlewares: middlewares.into(),
            endpoint: None,
            index: 0,
        }
    }

    /// Sets the handler that runs after the last middleware.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Handler) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Invokes the next middleware, or the endpoint once the chain is exhausted.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = Arc::clone(&self.middlewares[self.index]);
            self.index += 1;
            return handler(ctx, self).await;
        }

        match self.endpoint.take() {
            Some(endpoint) => endpoint(ctx).await,
            None => Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline"),
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors may:
///
/// - **Pass through**: call `next.run(ctx).await` without modification.
/// - **Short-circuit**: return a [`Response`] without calling `next`.
/// - **Decorate**: call `next.run(ctx).await` and modify the response.
/// - **Intercept emission**: wrap the context's emitter before calling `next`.
///
/// Implementations must not hold a lock across an `.await` point.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs each request's method, target, status, and duration once the
/// downstream response is available.
///
/// ```text
/// GET /movies/list-movies - 200 (1.2ms)
/// ```
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().as_str().to_string();
            let path = ctx.request().path().to_string();

            let response = next.run(ctx).await;

            tracing::info!(
                "{} {} - {} ({:?})",
                method,
                path,
                response.status().as_u16(),
                start.elapsed()
            );

            response
        })
    }
}

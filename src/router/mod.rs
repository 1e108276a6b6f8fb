//! Request routing: map URL patterns and HTTP methods to handler functions.
//!
//! This module provides [`Router`], which dispatches incoming HTTP requests to handler
//! functions based on the request method and URL path. Three pattern styles are supported:
//!
//! | Pattern              | Example match              | Captured params              |
//! |----------------------|----------------------------|------------------------------|
//! | `/users`             | `/users`                   | *(none)*                     |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                  |
//! | `/files/*`           | `/files/docs/readme.txt`   | `wildcard → "/docs/readme.txt"` |
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so `/users/` and
//! `/users` are treated as equivalent.
//!
//! Routes are matched in registration order; the first route whose method and pattern both
//! match the incoming request wins.
//!
//! Middleware can be attached globally with [`Router::layer`] (runs for every request,
//! including unmatched ones) or per route with [`Router::get_with`] and friends. The
//! chain for a request is: global layers, then route layers, then the handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::middleware::{MiddlewareHandler, Next};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased, heap-allocated async handler that processes a [`Context`] and returns a
/// [`Response`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be cloned and shared across
/// threads without copying the underlying closure. Build one with [`into_handler`].
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically via the blanket impl
/// below. Router methods accept `impl IntoHandler` so the two-type-parameter where-bound
/// does not need to be repeated at every call site.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

/// Erase a concrete handler into a shareable [`Handler`].
pub fn into_handler(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx: Context| handler.call(ctx))
}

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
enum Pattern {
    // Matches one exact path string, e.g. `/users`.
    Exact(String),
    // Matches a fixed number of segments where some may be named captures, e.g. `/users/:id`.
    Parameterized { segments: Vec<Segment> },
    // Matches any path that starts with the given prefix, e.g. `/files/*`.
    Wildcard(String),
}

impl Pattern {
    // Classify `pattern`: a `/*` suffix is a wildcard, any `:` makes it parameterized,
    // anything else is exact. A trailing slash (except on `/`) is stripped first.
    fn parse(pattern: &str) -> Self {
        let pattern = if pattern != "/" && pattern.ends_with('/') {
            &pattern[..pattern.len() - 1]
        } else {
            pattern
        };

        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Pattern::Wildcard(prefix.to_string());
        }

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| {
                    if let Some(p) = s.strip_prefix(':') {
                        Segment::Parameter(p.to_string())
                    } else {
                        Segment::Static(s.to_string())
                    }
                })
                .collect();

            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_string())
    }

    // Try to match `path` against this pattern, returning extracted [`PathParams`] on success.
    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = if path != "/" && path.ends_with('/') {
            &path[..path.len() - 1]
        } else {
            path
        };

        match self {
            Pattern::Exact(p) => {
                if p == path {
                    Some(PathParams::new())
                } else {
                    None
                }
            }
            Pattern::Parameterized { segments } => {
                let mut params = PathParams::new();
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

                if segments.len() != path_segments.len() {
                    return None;
                }

                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) => {
                            if s != path_seg {
                                return None;
                            }
                        }
                        Segment::Parameter(name) => {
                            params.insert(name.clone(), path_seg.to_string());
                        }
                    }
                }

                Some(params)
            }
            Pattern::Wildcard(prefix) => {
                if let Some(suffix) = path.strip_prefix(prefix) {
                    let mut params = PathParams::new();
                    params.insert("wildcard".to_string(), suffix.to_string());
                    Some(params)
                } else {
                    None
                }
            }
        }
    }
}

// A single registered route binding a method + pattern to a handler and its layers.
struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    fn new(method: Method, pattern: &str, layers: Vec<MiddlewareHandler>, endpoint: Handler) -> Self {
        let handler: Handler = if layers.is_empty() {
            endpoint
        } else {
            let layers: Arc<[MiddlewareHandler]> = layers.into();
            Arc::new(move |ctx: Context| {
                let next = Next::new(Arc::clone(&layers)).with_endpoint(Arc::clone(&endpoint));
                Box::pin(next.run(ctx)) as Pin<Box<dyn Future<Output = Response> + Send>>
            })
        };
        Self {
            method,
            pattern: Pattern::parse(pattern),
            handler,
        }
    }

    // Returns `Some(params)` when both the HTTP method and path pattern match, `None` otherwise.
    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        if &self.method == method {
            self.pattern.matches(path)
        } else {
            None
        }
    }
}

/// HTTP request router that dispatches requests to registered handler functions.
///
/// Routes are evaluated in registration order; the first route whose HTTP method and path
/// pattern both match the incoming request is used. When no route matches, a
/// `404 Not Found` response is returned (after the global layers ran).
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use movie_catalog::{Router, Response, StatusCode, context::Context};
/// use movie_catalog::middleware::{LoggerMiddleware, from_middleware};
///
/// let mut router = Router::new();
/// router.layer(from_middleware(Arc::new(LoggerMiddleware)));
///
/// router.get("/movies/find-movie/:id", |ctx: Context| async move {
///     let id = ctx.params().get("id").unwrap_or("unknown").to_owned();
///     Response::new(StatusCode::Ok).body(id)
/// });
/// ```
pub struct Router {
    routes: Vec<Route>,
    layers: Vec<MiddlewareHandler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a new, empty `Router` with no routes and no layers.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Add a middleware that wraps every request, matched or not.
    ///
    /// Layers run in the order they were added.
    pub fn layer(&mut self, middleware: MiddlewareHandler) {
        self.layers.push(middleware);
    }

    /// Register a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, Vec::new(), handler);
    }

    /// Register a `GET` handler wrapped by route-specific middleware.
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use movie_catalog::{Router, Response, StatusCode, context::Context};
    /// use movie_catalog::cache::{CacheStore, ResponseCache};
    /// use movie_catalog::middleware::from_middleware;
    ///
    /// let store = Arc::new(CacheStore::with_default_ttl());
    /// let cache = from_middleware(Arc::new(ResponseCache::new(store)));
    ///
    /// let mut router = Router::new();
    /// router.get_with("/movies/list-movies", vec![cache], |ctx: Context| async move {
    ///     ctx.send_json(StatusCode::Ok, &Vec::<String>::new())
    /// });
    /// ```
    pub fn get_with(
        &mut self,
        path: &str,
        layers: Vec<MiddlewareHandler>,
        handler: impl IntoHandler,
    ) {
        self.add_route(Method::Get, path, layers, handler);
    }

    /// Register a handler for `POST` requests matching `path`.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Post, path, Vec::new(), handler);
    }

    /// Register a handler for `PUT` requests matching `path`.
    pub fn put(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Put, path, Vec::new(), handler);
    }

    /// Register a handler for `DELETE` requests matching `path`.
    pub fn delete(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Delete, path, Vec::new(), handler);
    }

    /// Register a handler for `OPTIONS` requests matching `path`.
    pub fn options(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Options, path, Vec::new(), handler);
    }

    /// Register a handler for `PATCH` requests matching `path`.
    pub fn patch(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Patch, path, Vec::new(), handler);
    }

    fn add_route(
        &mut self,
        method: Method,
        path: &str,
        layers: Vec<MiddlewareHandler>,
        handler: impl IntoHandler,
    ) {
        self.routes
            .push(Route::new(method, path, layers, into_handler(handler)));
    }

    /// Return the number of routes registered in this router.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Return `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch `request` through the global layers to the first matching route.
    ///
    /// Falls back to `404 Not Found` when no route matches.
    pub async fn route(&self, request: Request) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            route
                .matches(request.method(), request.path())
                .map(|params| (Arc::clone(&route.handler), params))
        });

        let (endpoint, params) = match matched {
            Some(found) => found,
            None => (into_handler(not_found), PathParams::new()),
        };
        let ctx = Context::with_params(request, params);

        if self.layers.is_empty() {
            return endpoint(ctx).await;
        }
        Next::new(self.layers.clone())
            .with_endpoint(endpoint)
            .run(ctx)
            .await
    }
}

async fn not_found(_ctx: Context) -> Response {
    Response::new(StatusCode::NotFound)
}

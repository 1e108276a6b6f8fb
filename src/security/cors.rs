use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::{Method, Response, StatusCode};

/// CORS middleware: answers preflight requests and adds `Access-Control-*`
/// headers to responses for allowed origins.
///
/// - Requests without an `Origin` header, or from an origin that is not
///   allowed, pass through untouched.
/// - `OPTIONS` requests from an allowed origin are answered with
///   `204 No Content` and never reach the router.
/// - `Vary: Origin` is added whenever a specific origin is echoed back.
///
/// # Examples
///
/// ```rust
/// use movie_catalog::security::CorsMiddleware;
///
/// // Any origin, like a front end served from anywhere.
/// let open = CorsMiddleware::permissive();
///
/// let strict = CorsMiddleware::new()
///     .allow_origin("https://movies.example.com")
///     .allow_header("X-Request-ID");
/// ```
pub struct CorsMiddleware {
    policy: Arc<Policy>,
}

struct Policy {
    origins: Vec<String>,
    methods: Vec<String>,
    headers: Vec<String>,
    max_age_secs: u32,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::permissive()
    }
}

impl CorsMiddleware {
    /// No origins allowed yet; the catalog's methods and `Content-Type`.
    pub fn new() -> Self {
        Self {
            policy: Arc::new(Policy {
                origins: Vec::new(),
                methods: ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
                    .map(String::from)
                    .to_vec(),
                headers: vec!["Content-Type".to_string()],
                max_age_secs: 3600,
            }),
        }
    }

    /// Allow every origin.
    pub fn permissive() -> Self {
        Self::new().allow_origin("*")
    }

    /// Add an allowed origin; `"*"` allows all of them.
    #[must_use]
    pub fn allow_origin(self, origin: impl Into<String>) -> Self {
        self.edit(|p| p.origins.push(origin.into()))
    }

    #[must_use]
    pub fn allow_method(self, method: impl Into<String>) -> Self {
        self.edit(|p| p.methods.push(method.into()))
    }

    #[must_use]
    pub fn allow_header(self, header: impl Into<String>) -> Self {
        self.edit(|p| p.headers.push(header.into()))
    }

    /// How long browsers may cache a preflight answer.
    #[must_use]
    pub fn max_age(self, secs: u32) -> Self {
        self.edit(|p| p.max_age_secs = secs)
    }

    fn edit(mut self, f: impl FnOnce(&mut Policy)) -> Self {
        // Builders run before the middleware is shared, so this is the only handle.
        if let Some(policy) = Arc::get_mut(&mut self.policy) {
            f(policy);
        }
        self
    }
}

impl Policy {
    // The value for `Access-Control-Allow-Origin`, or `None` if `origin` is refused.
    fn allow(&self, origin: &str) -> Option<String> {
        if self.origins.iter().any(|o| o == "*") {
            Some("*".to_owned())
        } else if self.origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }

    fn decorate(&self, resp: &mut Response, allow_origin: &str) {
        resp.add_header("Access-Control-Allow-Origin", allow_origin);
        resp.add_header("Access-Control-Allow-Methods", self.methods.join(", "));
        resp.add_header("Access-Control-Allow-Headers", self.headers.join(", "));
        if allow_origin != "*" {
            resp.add_header("Vary", "Origin");
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let policy = Arc::clone(&self.policy);

        Box::pin(async move {
            let allow_origin = ctx
                .request()
                .headers()
                .get("origin")
                .and_then(|origin| policy.allow(origin));
            let Some(allow_origin) = allow_origin else {
                return next.run(ctx).await;
            };

            if ctx.request().method() == &Method::Options {
                let mut resp = Response::new(StatusCode::NoContent)
                    .header("Access-Control-Max-Age", policy.max_age_secs.to_string());
                policy.decorate(&mut resp, &allow_origin);
                return resp;
            }

            let mut resp = next.run(ctx).await;
            policy.decorate(&mut resp, &allow_origin);
            resp
        })
    }
}

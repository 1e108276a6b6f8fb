//! Per-request context: the parsed request, matched path parameters, and the
//! JSON emission function handlers answer through.
//!
//! Handlers that produce JSON call [`Context::send_json`] exactly once. That
//! call runs through an [`Emitter`], which middleware may wrap with
//! [`Context::wrap_emitter`] to observe the payload on its way out without the
//! handler knowing. Plain-text responses are built directly and bypass it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::{Request, Response, StatusCode};

/// Path parameters extracted from the matched route.
#[derive(Default, Debug, Clone)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Observer installed around the emission function.
///
/// Receives the status the handler chose and the payload, before the payload
/// is forwarded to the next (inner) emission.
pub type EmitHook = Arc<dyn Fn(StatusCode, &Value) + Send + Sync + 'static>;

/// The late-bound JSON emission function of a request.
///
/// Hooks are layered like wrappers: the most recently installed one runs
/// first, then control falls through to the older ones and finally to the
/// real send, which renders the payload with [`Response::json`].
#[derive(Default, Clone)]
pub struct Emitter {
    hooks: Vec<EmitHook>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the current emission function with `hook`.
    pub fn wrap(&mut self, hook: EmitHook) {
        self.hooks.push(hook);
    }

    /// Number of wrappers installed.
    pub fn depth(&self) -> usize {
        self.hooks.len()
    }

    /// Runs every wrapper, outermost first, then renders the response.
    pub fn emit(&self, status: StatusCode, payload: Value) -> Response {
        for hook in self.hooks.iter().rev() {
            hook(status, &payload);
        }
        Response::json(status, &payload)
    }
}

/// Per-request state handed to middleware and handlers.
pub struct Context {
    request: Request,
    params: PathParams,
    emitter: Emitter,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    /// Create a context carrying the parameters captured by the router.
    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self {
            request,
            params,
            emitter: Emitter::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Decode the request body as JSON.
    pub fn body_json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }

    /// Substitute the emission function with one that calls `hook` and then
    /// forwards to the previous one.
    pub fn wrap_emitter(&mut self, hook: EmitHook) {
        self.emitter.wrap(hook);
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Serialize `body` and emit it as a JSON response with `status`.
    ///
    /// A body that cannot be represented as JSON produces a plain-text `500`
    /// and never reaches the emission wrappers.
    pub fn send_json<T>(&self, status: StatusCode, body: &T) -> Response
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(body) {
            Ok(payload) => self.emitter.emit(status, payload),
            Err(e) => {
                error!(path = %self.request.path(), error = %e, "response body is not valid JSON");
                Response::new(StatusCode::InternalServerError).body("Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn ctx(target: &str) -> Context {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        Context::new(req)
    }

    #[test]
    fn send_json_without_wrappers_renders_payload() {
        let c = ctx("/movies/list-movies");
        let res = c.send_json(StatusCode::Ok, &json!([{"title": "Alien"}]));
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.content(), br#"[{"title":"Alien"}]"#);
    }

    #[test]
    fn wrappers_run_outermost_first_and_see_the_same_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut c = ctx("/");

        let inner = Arc::clone(&seen);
        c.wrap_emitter(Arc::new(move |_: StatusCode, p: &Value| {
            inner.lock().unwrap().push(format!("inner:{p}"));
        }));
        let outer = Arc::clone(&seen);
        c.wrap_emitter(Arc::new(move |s: StatusCode, p: &Value| {
            outer.lock().unwrap().push(format!("outer:{}:{p}", s.as_u16()));
        }));

        let res = c.send_json(StatusCode::NotFound, &json!({"message": "gone"}));
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                r#"outer:404:{"message":"gone"}"#.to_string(),
                r#"inner:{"message":"gone"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn unserializable_body_skips_wrappers() {
        let calls = Arc::new(Mutex::new(0));
        let mut c = ctx("/");
        let counter = Arc::clone(&calls);
        c.wrap_emitter(Arc::new(move |_: StatusCode, _: &Value| *counter.lock().unwrap() += 1));

        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not JSON object keys");
        let res = c.send_json(StatusCode::Ok, &bad);

        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn body_json_decodes_request_body() {
        let raw = b"POST /x HTTP/1.1\r\nContent-Length: 14\r\n\r\n{\"title\":\"Up\"}";
        let (req, _) = Request::parse(raw).unwrap();
        let c = Context::new(req);
        let v: Value = c.body_json().unwrap();
        assert_eq!(v, json!({"title": "Up"}));
    }
}

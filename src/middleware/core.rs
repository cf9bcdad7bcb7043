use http::header::HOST;
use http::{Method, Request, Response, StatusCode, Uri};
use std::path::Path;
use tracing::{debug, info, warn};

use super::docs::render_docs_page;
use super::response::{html, json, text_error};
use crate::config::GuardConfig;
use crate::error::{GuardError, RouteError};
use crate::validator::{OpenApiValidator, RequestValidator};

const DEFAULT_DOCS_TITLE: &str = "API documentation";

/// Gate in front of an application handler.
///
/// Serves the document and its documentation page, and lets a request
/// through to the wrapped handler only when it resolves to an operation and
/// passes validation. Holds no mutable state, so one instance can be shared
/// across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ValidatingMiddleware<V = OpenApiValidator> {
    validator: V,
    config: GuardConfig,
    docs_page: Option<String>,
}

impl ValidatingMiddleware<OpenApiValidator> {
    /// Load a document from disk and build the route index.
    ///
    /// Uses the default configuration; see [`ValidatingMiddleware::with_config`]
    /// to serve the endpoints elsewhere.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        Self::new(OpenApiValidator::from_file(path)?)
    }

    /// Load a document from an in-memory buffer and build the route index.
    pub fn from_bytes(data: &[u8]) -> Result<Self, GuardError> {
        Self::new(OpenApiValidator::from_bytes(data)?)
    }
}

impl<V: RequestValidator> ValidatingMiddleware<V> {
    pub fn new(validator: V) -> Result<Self, GuardError> {
        Self::with_config(validator, GuardConfig::default())
    }

    pub fn with_config(validator: V, config: GuardConfig) -> Result<Self, GuardError> {
        let docs_page = if config.serve_docs {
            let title = validator
                .document()
                .pointer("/info/title")
                .and_then(|t| t.as_str())
                .unwrap_or(DEFAULT_DOCS_TITLE);
            Some(render_docs_page(title, &config.docs_spec_url())?)
        } else {
            None
        };

        info!(
            spec_json_path = %config.spec_json_path,
            docs_path = %config.docs_path,
            serve_docs = config.serve_docs,
            "Validating middleware ready"
        );

        Ok(Self {
            validator,
            config,
            docs_page,
        })
    }

    #[must_use]
    pub fn validator(&self) -> &V {
        &self.validator
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Absolute URL used for route resolution.
    ///
    /// Origin-form requests take their authority from `Host`, or from the
    /// configured placeholder when there is no `Host` header.
    fn normalized_uri<B>(&self, request: &Request<B>) -> Result<Uri, RouteError> {
        let uri = request.uri();
        if uri.authority().is_some() {
            return Ok(uri.clone());
        }

        let host = request.headers().get(HOST).and_then(|h| h.to_str().ok());
        let (scheme, authority) = match host {
            Some(host) => (uri.scheme_str().unwrap_or("http"), host),
            None => {
                debug!(
                    placeholder_host = %self.config.placeholder_host,
                    "Request has no Host header, using placeholder"
                );
                (
                    uri.scheme_str()
                        .unwrap_or(self.config.placeholder_scheme.as_str()),
                    self.config.placeholder_host.as_str(),
                )
            }
        };

        Uri::builder()
            .scheme(scheme)
            .authority(authority)
            .path_and_query(uri.path_and_query().map_or("/", |p| p.as_str()))
            .build()
            .map_err(|e| RouteError::Other(format!("invalid request URL: {e}")))
    }

    /// Run everything except the wrapped handler.
    ///
    /// Returns the response to send instead of forwarding, or `None` when the
    /// request should be forwarded.
    #[must_use]
    pub fn intercept<B: AsRef<[u8]>>(&self, request: &Request<B>) -> Option<Response<Vec<u8>>> {
        let method = request.method();
        let path = request.uri().path();

        if method == Method::GET && path == self.config.spec_json_path {
            debug!(path = %path, "Serving OpenAPI document");
            return Some(json(self.validator.document()));
        }
        if method == Method::GET && path == self.config.docs_path {
            if let Some(page) = &self.docs_page {
                debug!(path = %path, "Serving documentation page");
                return Some(html(page));
            }
        }

        let uri = match self.normalized_uri(request) {
            Ok(uri) => uri,
            Err(e) => return Some(text_error(e.status(), &e.to_string())),
        };

        let route = match self.validator.resolve_route(method, &uri) {
            Ok(route) => route,
            Err(e) => {
                warn!(method = %method, path = %path, status = e.status().as_u16(), error = %e, "Request rejected");
                return Some(text_error(e.status(), &e.to_string()));
            }
        };

        if let Err(e) = self.validator.validate(&route, request) {
            warn!(
                method = %method,
                path = %path,
                route_pattern = %route.route.path_pattern,
                error = %e,
                "Request failed validation"
            );
            return Some(text_error(StatusCode::BAD_REQUEST, &e.to_string()));
        }

        None
    }

    /// Validate `request` and forward it to `next` when it passes.
    ///
    /// `next` receives the original request and its response is returned as is.
    pub fn handle<B, R, F>(&self, request: Request<B>, next: F) -> Response<R>
    where
        B: AsRef<[u8]>,
        R: From<Vec<u8>>,
        F: FnOnce(Request<B>) -> Response<R>,
    {
        match self.intercept(&request) {
            Some(response) => response.map(R::from),
            None => next(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::router::RouteMatch;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Records the URL each resolution was attempted with.
    struct RecordingValidator {
        document: Value,
        seen: Mutex<Vec<Uri>>,
    }

    impl RequestValidator for RecordingValidator {
        fn resolve_route(&self, _method: &Method, url: &Uri) -> Result<RouteMatch, RouteError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(url.clone());
            }
            Err(RouteError::PathNotFound)
        }

        fn validate<B: AsRef<[u8]>>(&self, _route: &RouteMatch, _request: &Request<B>) -> Result<(), ValidationError> {
            Ok(())
        }

        fn document(&self) -> &Value {
            &self.document
        }
    }

    fn recording() -> ValidatingMiddleware<RecordingValidator> {
        ValidatingMiddleware::new(RecordingValidator {
            document: json!({"openapi": "3.1.0", "info": {"title": "Recorder", "version": "1"}}),
            seen: Mutex::new(Vec::new()),
        })
        .unwrap()
    }

    fn last_seen(mw: &ValidatingMiddleware<RecordingValidator>) -> Uri {
        mw.validator().seen.lock().unwrap().last().cloned().unwrap()
    }

    #[test]
    fn test_missing_host_uses_placeholder() {
        let mw = recording();
        let req = Request::get("/pets?limit=1").body(Vec::<u8>::new()).unwrap();
        let res = mw.intercept(&req).unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(last_seen(&mw).to_string(), "http://localhost/pets?limit=1");
    }

    #[test]
    fn test_host_header_supplies_authority() {
        let mw = recording();
        let req = Request::get("/pets")
            .header(HOST, "api.example.com:8080")
            .body(Vec::<u8>::new())
            .unwrap();
        assert!(mw.intercept(&req).is_some());
        assert_eq!(last_seen(&mw).to_string(), "http://api.example.com:8080/pets");
    }

    #[test]
    fn test_absolute_uri_kept() {
        let mw = recording();
        let req = Request::get("https://example.org/v1/pets").body(Vec::<u8>::new()).unwrap();
        assert!(mw.intercept(&req).is_some());
        assert_eq!(last_seen(&mw).to_string(), "https://example.org/v1/pets");
    }

    #[test]
    fn test_docs_disabled_falls_through() {
        let config = GuardConfig {
            serve_docs: false,
            ..GuardConfig::default()
        };
        let mw = ValidatingMiddleware::with_config(
            RecordingValidator {
                document: json!({}),
                seen: Mutex::new(Vec::new()),
            },
            config,
        )
        .unwrap();
        let req = Request::get("/").body(Vec::<u8>::new()).unwrap();
        let res = mw.intercept(&req).unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body().as_slice(), b"Path does not exist");
    }

    #[test]
    fn test_custom_endpoint_paths() {
        let config = GuardConfig {
            spec_json_path: "/openapi.json".to_string(),
            docs_path: "/docs".to_string(),
            ..GuardConfig::default()
        };
        let mw = ValidatingMiddleware::with_config(
            RecordingValidator {
                document: json!({"openapi": "3.0.3"}),
                seen: Mutex::new(Vec::new()),
            },
            config,
        )
        .unwrap();

        let spec = mw
            .intercept(&Request::get("/openapi.json").body(Vec::<u8>::new()).unwrap())
            .unwrap();
        assert_eq!(spec.status(), StatusCode::OK);

        let docs = mw
            .intercept(&Request::get("/docs").body(Vec::<u8>::new()).unwrap())
            .unwrap();
        let body = String::from_utf8(docs.into_body()).unwrap();
        assert!(body.contains(r#"spec-url="/openapi.json""#));
        assert!(body.contains("API documentation"));
    }

    #[test]
    fn test_post_to_spec_path_is_routed() {
        let mw = recording();
        let req = Request::post("/spec.json").body(Vec::<u8>::new()).unwrap();
        let res = mw.intercept(&req).unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_middleware_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ValidatingMiddleware>();
    }
}

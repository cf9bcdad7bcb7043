//! Route index - built once from a document, read on every request.

use crate::error::{RouteError, RouteIndexError};
use crate::spec::{build_routes, RouteMeta, Specification};
use http::{Method, Uri};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::radix::{PathLookup, PathTree};
use super::server::ServerMatcher;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` since they come from the route tree built at
/// startup; values are per-request data decoded from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully resolving a request to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched operation
    pub route: Arc<RouteMeta>,
    /// Percent-decoded path parameters (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
    /// URL of the server entry the request matched
    pub server_url: Arc<str>,
}

impl RouteMatch {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Lookup structure mapping (server, method, path) to operations.
///
/// Derived from exactly one [`Specification`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RouteIndex {
    servers: Vec<(ServerMatcher, Arc<str>)>,
    tree: PathTree,
    routes: Vec<Arc<RouteMeta>>,
}

impl RouteIndex {
    /// Build the index: extract operations, compile schemas, servers and the path tree.
    pub fn build(spec: &Specification) -> Result<Self, RouteIndexError> {
        let routes: Vec<Arc<RouteMeta>> = build_routes(spec)?
            .into_iter()
            .map(Arc::new)
            .collect();
        let tree = PathTree::new(&routes)?;
        let servers: Vec<(ServerMatcher, Arc<str>)> = ServerMatcher::from_document(spec.document())?
            .into_iter()
            .map(|s| {
                let url = Arc::from(s.url());
                (s, url)
            })
            .collect();

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.path_pattern))
            .collect();
        let server_urls: Vec<&str> = servers.iter().map(|(s, _)| s.url()).collect();

        info!(
            routes_count = routes.len(),
            servers = ?server_urls,
            routes_summary = ?routes_summary,
            "Route index built"
        );

        Ok(Self {
            servers,
            tree,
            routes,
        })
    }

    /// All indexed operations, in document order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteMeta>] {
        &self.routes
    }

    /// URLs of the servers requests are matched against.
    pub fn server_urls(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(|(s, _)| s.url())
    }

    /// One line per route: `METHOD /path -> operation`.
    #[must_use]
    pub fn dump_routes(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{} {} -> {}", r.method, r.path_pattern, r.display_name()))
            .collect()
    }

    /// Resolve a request to a route and its path parameters.
    ///
    /// `uri` should carry scheme and authority; without an authority only
    /// relative servers can match.
    pub fn resolve(&self, method: &Method, uri: &Uri) -> Result<RouteMatch, RouteError> {
        let scheme = uri.scheme_str().unwrap_or("http");
        let authority = uri.authority().map(|a| a.as_str());
        let path = uri.path();

        debug!(
            method = %method,
            path = %path,
            authority = ?authority,
            "Route match attempt"
        );

        let mut server_matched = false;
        let mut method_mismatch = false;

        for (server, server_url) in &self.servers {
            let Some(rest) = server.strip(scheme, authority, path) else {
                continue;
            };
            server_matched = true;

            let decoded = decode_segments(rest)?;
            let segments: Vec<&str> = decoded.iter().map(|s| s.as_ref()).collect();

            match self.tree.lookup(&segments, method) {
                PathLookup::Matched(route, path_params) => {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.path_pattern,
                        server = %server_url,
                        path_params = ?path_params,
                        "Route matched"
                    );
                    return Ok(RouteMatch {
                        route,
                        path_params,
                        server_url: Arc::clone(server_url),
                    });
                }
                PathLookup::MethodNotAllowed => method_mismatch = true,
                PathLookup::NotFound => {}
            }
        }

        let err = if !server_matched {
            RouteError::NoServer
        } else if method_mismatch {
            RouteError::MethodNotAllowed
        } else {
            RouteError::PathNotFound
        };
        warn!(method = %method, path = %path, error = %err, "No route matched");
        Err(err)
    }
}

/// Split a path into non-empty, percent-decoded segments.
fn decode_segments(path: &str) -> Result<Vec<Cow<'_, str>>, RouteError> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            urlencoding::decode(segment).map_err(|_| {
                RouteError::Other(format!(
                    "invalid percent-encoding in path segment `{segment}`"
                ))
            })
        })
        .collect()
}

//! # Router Module
//!
//! Path matching and route resolution against an OpenAPI document.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling the document's `servers` list into URL matchers
//! - Building a radix tree from the path templates
//! - Resolving a (method, URL) pair to an operation and its path parameters
//! - Telling apart the three ways resolution fails (unknown host, unknown
//!   path, unsupported method)
//!
//! ## Architecture
//!
//! Resolution runs in two phases:
//!
//! 1. **Server matching**: the request's scheme, authority and path are
//!    matched against each server entry; a match yields the path below the
//!    server's base path.
//!
//! 2. **Path matching**: the remaining path is split into percent-decoded
//!    segments and looked up in the radix tree, which prefers static
//!    segments over parameterized ones.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specguard::{router::RouteIndex, spec::Specification};
//! use http::{Method, Uri};
//!
//! let spec = Specification::from_file("openapi.yaml")?;
//! let index = RouteIndex::build(&spec)?;
//!
//! let uri: Uri = "http://localhost/pets/123".parse()?;
//! let matched = index.resolve(&Method::GET, &uri)?;
//! println!("Route: {}", matched.route.path_pattern);
//! println!("id: {:?}", matched.get_path_param("id"));
//! ```

mod core;
mod radix;
mod server;

pub use core::{ParamVec, RouteIndex, RouteMatch, MAX_INLINE_PARAMS};
pub use server::ServerMatcher;

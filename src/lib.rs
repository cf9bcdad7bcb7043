//! # specguard
//!
//! **specguard** is an HTTP middleware that validates incoming requests
//! against an [OpenAPI 3.x](https://spec.openapis.org/oas/v3.1.0) document
//! before they reach application code, and serves the document together with
//! a documentation page.
//!
//! ## Overview
//!
//! The middleware is built once from a document and then consulted on every
//! request. It is framework-agnostic: requests and responses are the
//! [`http`] crate's types, and the wrapped handler is any
//! `FnOnce(Request<B>) -> Response<R>`.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Loading OpenAPI documents and extracting operation metadata
//! - **[`router`]** - Server matching and radix-tree path resolution
//! - **[`validator`]** - Parameter and body validation with compiled JSON Schemas
//! - **[`middleware`]** - The request gate and its fixed endpoints
//! - **[`config`]** - Environment-driven configuration
//! - **[`cli`]** - The `specguard` command-line tool
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Guard as ValidatingMiddleware
//!     participant Index as RouteIndex
//!     participant Val as OpenApiValidator
//!     participant App as Wrapped handler
//!
//!     Client->>Guard: GET /pets/42
//!     alt GET /spec.json or GET /
//!         Guard-->>Client: 200 document / docs page
//!     end
//!     Guard->>Guard: Fill in missing Host
//!     Guard->>Index: resolve(GET, http://localhost/pets/42)
//!     alt No server, path or method
//!         Index-->>Client: 404 / 400 plain text
//!     end
//!     Index-->>Guard: RouteMatch {id: "42"}
//!     Guard->>Val: validate(route, request)
//!     alt Invalid parameters or body
//!         Val-->>Client: 400 plain text
//!     end
//!     Guard->>App: original request
//!     App-->>Client: response, unmodified
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specguard::ValidatingMiddleware;
//! use http::{Request, Response};
//!
//! let guard = ValidatingMiddleware::from_file("openapi.yaml")?;
//!
//! let request = Request::get("/pets/42").body(Vec::new())?;
//! let response = guard.handle(request, |req| {
//!     // application logic
//!     Response::new(b"{\"id\": 42}".to_vec())
//! });
//! ```
//!
//! ## Error Handling
//!
//! Construction fails with [`GuardError`] when the document cannot be read,
//! does not parse, or yields an unusable route index. Per-request failures
//! are answered directly:
//!
//! | Failure | Status | Body |
//! |---|---|---|
//! | no server matches | 404 | `Host does not exist` |
//! | no path matches | 404 | `Path does not exist` |
//! | method not defined for path | 400 | `Path doesn't support the HTTP method` |
//! | parameter or body invalid | 400 | validation message |

pub mod cli;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod spec;
pub mod validator;

pub use config::GuardConfig;
pub use error::{GuardError, LoadError, ParseError, RouteError, RouteIndexError, ValidationError};
pub use middleware::ValidatingMiddleware;
pub use router::{RouteIndex, RouteMatch};
pub use spec::Specification;
pub use validator::{OpenApiValidator, RequestValidator};

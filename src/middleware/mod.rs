//! # Middleware Module
//!
//! [`ValidatingMiddleware`] gates every request through OpenAPI validation
//! before it reaches application code.
//!
//! ## Request Flow
//!
//! 1. `GET /spec.json` serves the document as JSON
//! 2. `GET /` serves a documentation page that loads `./spec.json`
//! 3. Requests without an authority get one from `Host` or a placeholder
//! 4. The request is resolved to an operation
//! 5. Parameters and body are validated
//! 6. The original request is handed to the wrapped handler
//!
//! Failures in steps 3 to 5 short-circuit with a plain-text 404 or 400.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specguard::ValidatingMiddleware;
//! use http::{Request, Response};
//!
//! let guard = ValidatingMiddleware::from_file("openapi.yaml")?;
//! let response = guard.handle(request, |req: Request<Vec<u8>>| {
//!     Response::new(b"hello".to_vec())
//! });
//! ```

mod core;
mod docs;
mod response;

pub use core::ValidatingMiddleware;

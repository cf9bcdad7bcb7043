//! # Validator Module
//!
//! Request validation against the operations of an OpenAPI document.
//!
//! [`RequestValidator`] is the seam between the middleware and the
//! validation engine: route resolution, request validation and access to
//! the served document. [`OpenApiValidator`] is the implementation backed by
//! a [`Specification`] and the [`RouteIndex`] built from it.
//!
//! ## What is checked
//!
//! - Path, query, header and cookie parameters, decoded per `style` and
//!   `explode` and coerced to the schema's primitive type
//! - Presence of required parameters and request bodies
//! - The request `Content-Type` against the declared media types
//! - JSON and form-urlencoded bodies against their schemas
//!
//! Responses are not validated.

mod body;
mod params;
mod schema;

pub use schema::CompiledSchema;

use crate::error::{GuardError, RouteError, ValidationError};
use crate::router::{RouteIndex, RouteMatch};
use crate::spec::Specification;
use http::{Method, Request, Uri};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use params::{validate_parameters, ParameterSources};

/// Route resolution and request validation, as used by the middleware.
pub trait RequestValidator {
    /// Resolve a request line to the operation it targets.
    fn resolve_route(&self, method: &Method, url: &Uri) -> Result<RouteMatch, RouteError>;

    /// Check the parameters and body of a request against its resolved route.
    fn validate<B: AsRef<[u8]>>(
        &self,
        route: &RouteMatch,
        request: &Request<B>,
    ) -> Result<(), ValidationError>;

    /// The document served at `GET /spec.json` (or the configured path).
    fn document(&self) -> &Value;
}

/// [`RequestValidator`] driven by a loaded OpenAPI document.
#[derive(Debug, Clone)]
pub struct OpenApiValidator {
    spec: Specification,
    index: RouteIndex,
}

impl OpenApiValidator {
    /// Build the route index for an already loaded document.
    pub fn new(spec: Specification) -> Result<Self, GuardError> {
        let index = RouteIndex::build(&spec)?;
        Ok(Self { spec, index })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        Self::new(Specification::from_file(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, GuardError> {
        Self::new(Specification::from_bytes(data)?)
    }

    #[must_use]
    pub fn spec(&self) -> &Specification {
        &self.spec
    }

    #[must_use]
    pub fn index(&self) -> &RouteIndex {
        &self.index
    }
}

impl RequestValidator for OpenApiValidator {
    fn resolve_route(&self, method: &Method, url: &Uri) -> Result<RouteMatch, RouteError> {
        self.index.resolve(method, url)
    }

    fn validate<B: AsRef<[u8]>>(
        &self,
        route: &RouteMatch,
        request: &Request<B>,
    ) -> Result<(), ValidationError> {
        let sources = ParameterSources::new(route, request.uri().query(), request.headers());
        validate_parameters(&sources)?;
        body::validate_body(
            route.route.request_body.as_ref(),
            request.headers(),
            request.body().as_ref(),
        )?;
        debug!(
            route_pattern = %route.route.path_pattern,
            operation = %route.route.display_name(),
            "Request validated"
        );
        Ok(())
    }

    fn document(&self) -> &Value {
        self.spec.document()
    }
}

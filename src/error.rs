//! Error types for spec loading, route indexing, routing and validation.
//!
//! Construction failures ([`GuardError`]) are fatal: a middleware is either
//! fully built or not built at all. Per-request failures ([`RouteError`] and
//! [`ValidationError`]) are recoverable and map onto a status code and a
//! plain-text message.

use http::{Method, StatusCode};
use std::path::PathBuf;

/// Errors raised while constructing a middleware.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The spec file could not be read, or its contents are invalid.
    #[error("failed to load OpenAPI document from {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    /// An in-memory document is malformed.
    #[error("malformed OpenAPI document: {0}")]
    Parse(#[from] ParseError),

    /// The route index could not be built from the document.
    #[error("failed to build route index: {0}")]
    RouteIndex(#[from] RouteIndexError),

    /// The documentation page template failed to render.
    #[error("failed to render documentation page: {0}")]
    DocsTemplate(#[from] minijinja::Error),
}

/// Underlying cause of a [`GuardError::Load`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Reasons a document fails to decode into an OpenAPI 3.x model.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("document root must be a mapping")]
    NotAnObject,

    #[error("missing `openapi` version field")]
    MissingVersion,

    #[error("unsupported OpenAPI version `{0}`, expected 3.x")]
    UnsupportedVersion(String),

    #[error("document does not match the OpenAPI object model: {0}")]
    Model(#[source] serde_json::Error),
}

/// Reasons the route index cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum RouteIndexError {
    #[error("invalid path template `{path}`: {reason}")]
    InvalidTemplate { path: String, reason: String },

    #[error("ambiguous routes for {method}: `{first}` and `{second}` match the same requests")]
    Ambiguous {
        method: Method,
        first: String,
        second: String,
    },

    #[error("invalid server url `{url}`: {reason}")]
    InvalidServer { url: String, reason: String },

    #[error("schema for {location} does not compile: {message}")]
    Schema { location: String, message: String },
}

/// Per-request route resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("Host does not exist")]
    NoServer,

    #[error("Path does not exist")]
    PathNotFound,

    #[error("Path doesn't support the HTTP method")]
    MethodNotAllowed,

    #[error("{0}")]
    Other(String),
}

impl RouteError {
    /// Status code the middleware answers with for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::NoServer | RouteError::PathNotFound => StatusCode::NOT_FOUND,
            RouteError::MethodNotAllowed | RouteError::Other(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// A request that resolved to a route but does not conform to its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("parameter \"{name}\" in {location} has an error: {reason}")]
    Parameter {
        name: String,
        location: String,
        reason: String,
    },

    #[error("request body has an error: {reason}")]
    Body { reason: String },
}

impl ValidationError {
    pub(crate) fn body(reason: impl Into<String>) -> Self {
        ValidationError::Body {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_error_messages_and_status() {
        assert_eq!(RouteError::NoServer.to_string(), "Host does not exist");
        assert_eq!(RouteError::NoServer.status(), StatusCode::NOT_FOUND);
        assert_eq!(RouteError::PathNotFound.to_string(), "Path does not exist");
        assert_eq!(RouteError::PathNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            RouteError::MethodNotAllowed.to_string(),
            "Path doesn't support the HTTP method"
        );
        assert_eq!(RouteError::MethodNotAllowed.status(), StatusCode::BAD_REQUEST);
        let other = RouteError::Other("bad segment".to_string());
        assert_eq!(other.to_string(), "bad segment");
        assert_eq!(other.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Parameter {
            name: "limit".to_string(),
            location: "query".to_string(),
            reason: "value is required but missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parameter \"limit\" in query has an error: value is required but missing"
        );
        assert_eq!(
            ValidationError::body("boom").to_string(),
            "request body has an error: boom"
        );
    }
}

//! # Spec Module
//!
//! Loading OpenAPI 3.x documents and extracting per-operation metadata.
//!
//! ## Overview
//!
//! - [`Specification`] holds a loaded document: the raw JSON value served to
//!   clients, a normalized copy and the typed `oas3` model built from it.
//! - [`build_routes`] walks the typed model and produces one [`RouteMeta`]
//!   per operation. Schemas are read from the normalized document, with
//!   `$ref`s inlined, and compiled.
//!
//! ## Supported Formats
//!
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! Documents loaded from memory are sniffed: a leading `{` means JSON.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specguard::spec::{build_routes, Specification};
//!
//! let spec = Specification::from_file("openapi.yaml")?;
//! for route in build_routes(&spec)? {
//!     println!("{} {} -> {}", route.method, route.path_pattern, route.display_name());
//! }
//! ```

mod build;
mod load;
mod types;

pub use build::{build_routes, resolve_ref};
pub(crate) use build::media_type_essence;
pub use load::{DocumentFormat, Specification};
pub use types::{
    MediaTypeMeta, ParameterLocation, ParameterMeta, ParameterStyle, RequestBodyMeta, RouteMeta,
};

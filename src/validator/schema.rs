use crate::error::RouteIndexError;
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Errors beyond the first that are appended to a failure message.
const EXTRA_ERRORS_REPORTED: usize = 3;

/// A JSON Schema compiled once at index build time and shared read-only.
#[derive(Clone)]
pub struct CompiledSchema {
    schema: Arc<Value>,
    validator: Arc<Validator>,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile `schema` as a draft 2020-12 schema (the dialect of OpenAPI 3.1).
    ///
    /// `location` names the schema in the error, e.g. `GET /pets parameter "limit"`.
    pub fn compile(schema: Value, location: &str) -> Result<Self, RouteIndexError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|e| RouteIndexError::Schema {
                location: location.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            schema: Arc::new(schema),
            validator: Arc::new(validator),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// First non-null `type` of the schema, if it declares one.
    #[must_use]
    pub fn primary_type(&self) -> Option<&str> {
        primary_type(&self.schema)
    }

    /// Validate `instance`, describing the first failure and a few more.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        let mut errors = self.validator.iter_errors(instance);
        if let Some(first) = errors.next() {
            let mut message = first.to_string();
            for err in errors.take(EXTRA_ERRORS_REPORTED) {
                message.push_str("; ");
                message.push_str(&err.to_string());
            }
            return Err(message);
        }
        Ok(())
    }
}

/// First non-null entry of a schema's `type` keyword.
pub(crate) fn primary_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

use crate::error::{GuardError, LoadError, ParseError};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Encoding of an OpenAPI document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension, if it names one.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Some(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }

    /// JSON when the first non-whitespace byte opens an object, YAML otherwise.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Self {
        match data.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// A loaded OpenAPI 3.x document.
///
/// Keeps the document exactly as it was decoded (served back verbatim) next
/// to the typed model used to build the route index.
#[derive(Debug, Clone)]
pub struct Specification {
    document: Value,
    normalized: Value,
    model: OpenApiV3Spec,
    source: Option<PathBuf>,
}

impl Specification {
    /// Load a document from disk.
    ///
    /// Both an unreadable file and undecodable contents are reported as
    /// [`GuardError::Load`] carrying the path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading OpenAPI document");
        let load_err = |source: LoadError| GuardError::Load {
            path: path.to_path_buf(),
            source,
        };

        let data = std::fs::read(path).map_err(|e| load_err(LoadError::Io(e)))?;
        let format = DocumentFormat::from_path(path).unwrap_or_else(|| DocumentFormat::sniff(&data));
        let mut spec =
            Self::decode(&data, format).map_err(|e| load_err(LoadError::Parse(e)))?;
        spec.source = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Load a document from an in-memory buffer (JSON or YAML).
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        Self::decode(data, DocumentFormat::sniff(data))
    }

    fn decode(data: &[u8], format: DocumentFormat) -> Result<Self, ParseError> {
        let document: Value = match format {
            DocumentFormat::Json => serde_json::from_slice(data).map_err(ParseError::Json)?,
            DocumentFormat::Yaml => serde_yaml::from_slice(data).map_err(ParseError::Yaml)?,
        };

        let root = document.as_object().ok_or(ParseError::NotAnObject)?;
        let version = match root.get("openapi") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ParseError::MissingVersion),
        };
        if !version.starts_with("3.") {
            return Err(ParseError::UnsupportedVersion(version));
        }

        let mut normalized = document.clone();
        // An unquoted `openapi: 3.0` decodes as a YAML number
        normalized["openapi"] = Value::String(version.clone());
        strip_unknown_verbs(&mut normalized);
        normalize_legacy_schemas(&mut normalized);
        let model: OpenApiV3Spec =
            serde_json::from_value(normalized.clone()).map_err(ParseError::Model)?;

        info!(
            title = %model.info.title,
            openapi_version = %version,
            format = ?format,
            "OpenAPI document loaded"
        );

        Ok(Self {
            document,
            normalized,
            model,
            source: None,
        })
    }

    /// The document exactly as decoded.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The document after path-item cleanup and 3.0 schema rewrites.
    #[must_use]
    pub fn normalized(&self) -> &Value {
        &self.normalized
    }

    #[must_use]
    pub fn model(&self) -> &OpenApiV3Spec {
        &self.model
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.model.info.title
    }

    /// File the document was loaded from, when it came from disk.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

/// Rewrite OpenAPI 3.0 schema idioms into their JSON Schema equivalents.
///
/// `nullable: true` widens `type` (and `enum`) with `null`; boolean
/// `exclusiveMinimum`/`exclusiveMaximum` take the bound as their value.
fn normalize_legacy_schemas(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::Bool(nullable)) = obj.get("nullable").cloned() {
                obj.remove("nullable");
                if nullable {
                    let widened = match obj.get("type") {
                        Some(Value::String(t)) => Some(vec![Value::String(t.clone()), Value::from("null")]),
                        Some(Value::Array(types)) if !types.iter().any(|t| t.as_str() == Some("null")) => {
                            let mut types = types.clone();
                            types.push(Value::from("null"));
                            Some(types)
                        }
                        _ => None,
                    };
                    if let Some(types) = widened {
                        obj.insert("type".to_string(), Value::Array(types));
                    }
                    if let Some(Value::Array(values)) = obj.get_mut("enum") {
                        if !values.contains(&Value::Null) {
                            values.push(Value::Null);
                        }
                    }
                }
            }
            for (flag, bound) in [("exclusiveMinimum", "minimum"), ("exclusiveMaximum", "maximum")] {
                if let Some(Value::Bool(exclusive)) = obj.get(flag).cloned() {
                    obj.remove(flag);
                    if exclusive {
                        if let Some(limit) = obj.remove(bound) {
                            obj.insert(flag.to_string(), limit);
                        }
                    }
                }
            }
            for v in obj.values_mut() {
                normalize_legacy_schemas(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                normalize_legacy_schemas(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "x-internal": true }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("patch").is_some());
        assert!(v["paths"]["/x"].get("x-internal").is_some());
    }

    #[test]
    fn test_nullable_becomes_type_union() {
        let mut v = json!({"type": "string", "nullable": true, "enum": ["a", "b"]});
        normalize_legacy_schemas(&mut v);
        assert_eq!(v, json!({"type": ["string", "null"], "enum": ["a", "b", null]}));
    }

    #[test]
    fn test_boolean_exclusive_bounds() {
        let mut v = json!({
            "type": "object",
            "properties": {
                "age": {"type": "integer", "minimum": 0, "exclusiveMinimum": true},
                "score": {"type": "number", "maximum": 10, "exclusiveMaximum": false}
            }
        });
        normalize_legacy_schemas(&mut v);
        assert_eq!(v["properties"]["age"], json!({"type": "integer", "exclusiveMinimum": 0}));
        assert_eq!(v["properties"]["score"], json!({"type": "number", "maximum": 10}));
    }

    #[test]
    fn test_property_named_nullable_is_untouched() {
        let mut v = json!({"properties": {"nullable": {"type": "boolean"}}});
        normalize_legacy_schemas(&mut v);
        assert_eq!(v, json!({"properties": {"nullable": {"type": "boolean"}}}));
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(DocumentFormat::sniff(b"  \n{\"openapi\":\"3.1.0\"}"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::sniff(b"openapi: 3.1.0\n"), DocumentFormat::Yaml);
        assert_eq!(
            DocumentFormat::from_path(Path::new("api.YML")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("api.txt")), None);
    }

    #[test]
    fn test_rejects_swagger_2() {
        let err = Specification::from_bytes(b"swagger: '2.0'\ninfo: {title: x, version: '1'}\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingVersion));

        let err = Specification::from_bytes(b"openapi: '2.0'\ninfo: {title: x, version: '1'}\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn test_numeric_version_is_accepted() {
        let spec = Specification::from_bytes(b"openapi: 3.0\ninfo: {title: Bare number, version: '1'}\npaths: {}\n")
            .unwrap();
        assert_eq!(spec.title(), "Bare number");
        assert_eq!(spec.normalized()["openapi"], "3.0");
        assert!(spec.document()["openapi"].is_number());

        let err = Specification::from_bytes(b"openapi: 2.0\ninfo: {title: x, version: '1'}\n").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn test_rejects_non_mapping_root() {
        let err = Specification::from_bytes(b"- just\n- a list\n").unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject));
    }

    #[test]
    fn test_document_kept_verbatim() {
        let yaml = br#"
openapi: 3.0.3
info: {title: Verbatim, version: "1"}
paths:
  /x:
    get:
      parameters:
        - {name: q, in: query, schema: {type: string, nullable: true}}
      responses:
        "200": {description: OK}
"#;
        let spec = Specification::from_bytes(yaml).unwrap();
        assert_eq!(spec.title(), "Verbatim");
        let raw = &spec.document()["paths"]["/x"]["get"]["parameters"][0]["schema"];
        assert_eq!(raw, &json!({"type": "string", "nullable": true}));
        let normalized = &spec.normalized()["paths"]["/x"]["get"]["parameters"][0]["schema"];
        assert_eq!(normalized, &json!({"type": ["string", "null"]}));
    }
}

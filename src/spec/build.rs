use super::load::Specification;
use super::types::{
    MediaTypeMeta, ParameterLocation, ParameterMeta, ParameterStyle, RequestBodyMeta, RouteMeta,
};
use crate::error::RouteIndexError;
use crate::validator::CompiledSchema;
use oas3::spec::{ObjectOrReference, Parameter, RequestBody};
use oas3::OpenApiV3Spec;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
const DEFS_REF_PREFIX: &str = "#/$defs/";

/// Upper bound on `$ref` hops when following parameter and body references.
const MAX_REF_HOPS: usize = 32;

/// Resolve a local `$ref` such as `#/components/schemas/User` against the document.
///
/// The fragment is a JSON pointer and may be percent-encoded.
#[must_use]
pub fn resolve_ref<'a>(document: &'a Value, ref_path: &str) -> Option<&'a Value> {
    let fragment = ref_path.strip_prefix('#')?;
    let fragment = urlencoding::decode(fragment).ok()?;
    document.pointer(&fragment)
}

/// Follow a chain of `$ref`s until an inline object is reached.
fn follow_refs<'a>(document: &'a Value, mut value: &'a Value) -> Option<&'a Value> {
    for _ in 0..MAX_REF_HOPS {
        match value.get("$ref").and_then(Value::as_str) {
            Some(ref_path) => value = resolve_ref(document, ref_path)?,
            None => return Some(value),
        }
    }
    None
}

/// Recursively inline local `$ref`s in a schema taken from the document.
///
/// Schemas are used exactly as written, so every JSON Schema keyword
/// survives. A `$ref` with sibling keywords is kept as an `allOf` member so
/// both apply. A reference that would re-enter a component schema already
/// being expanded is rewritten to `#/$defs/<name>` and `<name>` is recorded
/// in `recursive` so the caller can attach the definitions.
fn expand_schema_refs(
    document: &Value,
    value: &mut Value,
    stack: &mut Vec<String>,
    recursive: &mut BTreeSet<String>,
) {
    match value {
        Value::Object(obj) => {
            let local_ref = obj
                .get("$ref")
                .and_then(Value::as_str)
                .filter(|r| r.starts_with('#') && !r.starts_with(DEFS_REF_PREFIX))
                .map(str::to_owned);

            if let Some(ref_path) = local_ref {
                if stack.contains(&ref_path) {
                    match ref_path.strip_prefix(SCHEMA_REF_PREFIX) {
                        Some(name) => {
                            obj.insert(
                                "$ref".to_string(),
                                Value::String(format!("{DEFS_REF_PREFIX}{name}")),
                            );
                            recursive.insert(name.to_string());
                        }
                        None => {
                            warn!(ref_path = %ref_path, "Recursive reference outside components.schemas is not validated");
                            obj.remove("$ref");
                        }
                    }
                } else if let Some(mut resolved) = resolve_ref(document, &ref_path).cloned() {
                    stack.push(ref_path);
                    expand_schema_refs(document, &mut resolved, stack, recursive);
                    stack.pop();
                    obj.remove("$ref");

                    if obj.is_empty() {
                        *value = resolved;
                        return;
                    }
                    for v in obj.values_mut() {
                        expand_schema_refs(document, v, stack, recursive);
                    }
                    match obj.get_mut("allOf") {
                        Some(Value::Array(all)) => all.push(resolved),
                        _ => {
                            obj.insert("allOf".to_string(), Value::Array(vec![resolved]));
                        }
                    }
                    return;
                } else {
                    warn!(ref_path = %ref_path, "Unresolvable schema reference");
                }
            }

            for v in obj.values_mut() {
                expand_schema_refs(document, v, stack, recursive);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_schema_refs(document, v, stack, recursive);
            }
        }
        _ => {}
    }
}

fn rewrite_refs_to_defs(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(r)) = obj.get_mut("$ref") {
                if let Some(name) = r.strip_prefix(SCHEMA_REF_PREFIX) {
                    *r = format!("{DEFS_REF_PREFIX}{name}");
                }
            }
            for v in obj.values_mut() {
                rewrite_refs_to_defs(v);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(rewrite_refs_to_defs),
        _ => {}
    }
}

/// Turn a schema into a self-contained JSON Schema document.
///
/// Recursive references are served from a `$defs` section holding every
/// component schema.
fn self_contained_schema(document: &Value, schema: Value) -> Value {
    let mut schema = schema;
    let mut recursive = BTreeSet::new();
    expand_schema_refs(document, &mut schema, &mut Vec::new(), &mut recursive);

    if recursive.is_empty() {
        return schema;
    }
    if let (Value::Object(root), Some(Value::Object(components))) =
        (&mut schema, document.pointer("/components/schemas"))
    {
        let mut defs = match root.remove("$defs") {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        for (name, component) in components {
            let mut def = component.clone();
            rewrite_refs_to_defs(&mut def);
            defs.insert(name.clone(), def);
        }
        root.insert("$defs".to_string(), Value::Object(defs));
    }
    schema
}

fn compile_schema(
    document: &Value,
    raw: Option<&Value>,
    location: &str,
) -> Result<Option<CompiledSchema>, RouteIndexError> {
    match raw {
        Some(raw) => Ok(Some(CompiledSchema::compile(
            self_contained_schema(document, raw.clone()),
            location,
        )?)),
        None => Ok(None),
    }
}

fn resolve_parameter_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::Parameter> {
    let name = ref_path.strip_prefix("#/components/parameters/")?;
    spec.components
        .as_ref()?
        .parameters
        .get(name)
        .and_then(|param_ref| match param_ref {
            ObjectOrReference::Object(param) => Some(param),
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path),
        })
}

fn resolve_request_body_ref<'a>(spec: &'a OpenApiV3Spec, ref_path: &str) -> Option<&'a RequestBody> {
    let name = ref_path.strip_prefix("#/components/requestBodies/")?;
    spec.components
        .as_ref()?
        .request_bodies
        .get(name)
        .and_then(|body_ref| match body_ref {
            ObjectOrReference::Object(body) => Some(body),
            ObjectOrReference::Ref { ref_path, .. } => resolve_request_body_ref(spec, ref_path),
        })
}

/// Extract parameter metadata from an OpenAPI operation
///
/// `params` comes from the typed model; `raw_params` is the same list in the
/// normalized document, where the schemas are read from. Unresolvable
/// parameter references are skipped with a warning.
fn extract_parameters(
    spec: &Specification,
    params: &[ObjectOrReference<Parameter>],
    raw_params: Option<&Value>,
    location: &str,
) -> Result<Vec<ParameterMeta>, RouteIndexError> {
    let document = spec.normalized();
    let mut out = Vec::new();
    for (i, p) in params.iter().enumerate() {
        let param = match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path, .. } => {
                let resolved = resolve_parameter_ref(spec.model(), ref_path);
                if resolved.is_none() {
                    warn!(location = %location, ref_path = %ref_path, "Unresolvable parameter reference");
                }
                resolved
            }
        };
        let Some(param) = param else { continue };

        let param_location = ParameterLocation::from(param.location);
        let raw_schema = raw_params
            .and_then(|list| list.get(i))
            .and_then(|raw| follow_refs(document, raw))
            .and_then(|raw| raw.get("schema"));
        let schema = compile_schema(
            document,
            raw_schema,
            &format!("{location} parameter \"{}\" in {param_location}", param.name),
        )?;

        out.push(ParameterMeta {
            name: param.name.clone(),
            location: param_location,
            // Path parameters are always required
            required: param_location == ParameterLocation::Path
                || param.required.unwrap_or(false),
            style: param.style.map(ParameterStyle::from),
            explode: param.explode,
            schema,
        });
    }
    Ok(out)
}

/// Merge path-item parameters with operation parameters.
///
/// An operation parameter replaces a path-item parameter with the same name
/// and location.
fn merge_parameters(path_level: Vec<ParameterMeta>, operation_level: Vec<ParameterMeta>) -> Vec<ParameterMeta> {
    let mut merged: Vec<ParameterMeta> = path_level
        .into_iter()
        .filter(|p| {
            !operation_level
                .iter()
                .any(|o| o.location == p.location && o.name == p.name)
        })
        .collect();
    merged.extend(operation_level);
    merged
}

/// Media type without parameters, lower-cased.
pub(crate) fn media_type_essence(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Extract the request body metadata from an OpenAPI operation
///
/// Every declared media type is kept; those carrying a schema get it compiled.
fn extract_request_body(
    spec: &Specification,
    operation: &oas3::spec::Operation,
    raw_body: Option<&Value>,
    location: &str,
) -> Result<Option<RequestBodyMeta>, RouteIndexError> {
    let document = spec.normalized();
    let body = match operation.request_body.as_ref() {
        None => return Ok(None),
        Some(ObjectOrReference::Object(body)) => body,
        Some(ObjectOrReference::Ref { ref_path, .. }) => {
            match resolve_request_body_ref(spec.model(), ref_path) {
                Some(body) => body,
                None => {
                    warn!(location = %location, ref_path = %ref_path, "Unresolvable request body reference");
                    return Ok(None);
                }
            }
        }
    };
    let raw_content = raw_body
        .and_then(|raw| follow_refs(document, raw))
        .and_then(|raw| raw.get("content"));

    let mut content = Vec::with_capacity(body.content.len());
    for media_type in body.content.keys() {
        let raw_schema = raw_content
            .and_then(|c| c.get(media_type.as_str()))
            .and_then(|media| media.get("schema"));
        let schema = compile_schema(
            document,
            raw_schema,
            &format!("{location} request body ({media_type})"),
        )?;
        content.push(MediaTypeMeta {
            media_type: media_type_essence(media_type),
            schema,
        });
    }

    Ok(Some(RequestBodyMeta {
        required: body.required.unwrap_or(false),
        content,
    }))
}

/// Names of the `{param}` placeholders in a path template.
pub(crate) fn template_parameter_names(path: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    names
}

/// Build route metadata for all operations in an OpenAPI specification
///
/// Operations are walked through the typed model. Schemas are read from the
/// normalized document so no keyword is lost, then resolved and compiled
/// here so that request handling never compiles.
pub fn build_routes(spec: &Specification) -> Result<Vec<RouteMeta>, RouteIndexError> {
    let mut routes = Vec::new();
    let document = spec.normalized();

    let Some(paths_map) = spec.model().paths.as_ref() else {
        return Ok(routes);
    };

    for (path, item) in paths_map {
        let raw_item = document
            .get("paths")
            .and_then(|paths| paths.get(path.as_str()))
            .and_then(|raw| follow_refs(document, raw));

        for (method, operation) in item.methods() {
            let location = format!("{method} {path}");
            let method_key = method.as_str().to_ascii_lowercase();
            let raw_operation = raw_item.and_then(|raw| raw.get(method_key.as_str()));

            let path_level = extract_parameters(
                spec,
                &item.parameters,
                raw_item.and_then(|raw| raw.get("parameters")),
                &location,
            )?;
            let operation_level = extract_parameters(
                spec,
                &operation.parameters,
                raw_operation.and_then(|raw| raw.get("parameters")),
                &location,
            )?;
            let parameters = merge_parameters(path_level, operation_level);

            for name in template_parameter_names(path) {
                let declared = parameters
                    .iter()
                    .any(|p| p.location == ParameterLocation::Path && p.name == name);
                if !declared {
                    warn!(
                        location = %location,
                        parameter = %name,
                        "Path parameter in template is not declared; its value is not validated"
                    );
                }
            }

            let request_body = extract_request_body(
                spec,
                operation,
                raw_operation.and_then(|raw| raw.get("requestBody")),
                &location,
            )?;

            routes.push(RouteMeta {
                method: method.clone(),
                path_pattern: Arc::from(path.as_str()),
                operation_id: operation.operation_id.clone(),
                parameters,
                request_body,
            });
        }
    }

    Ok(routes)
}

//! Extracting and decoding request parameters.
//!
//! Raw values are pulled from the path match, query string, headers and
//! cookies, decoded according to the parameter's style and schema, then
//! checked against the compiled schema.

use crate::error::ValidationError;
use crate::router::RouteMatch;
use crate::spec::{ParameterLocation, ParameterMeta, ParameterStyle};
use crate::validator::schema::primary_type;
use http::header::COOKIE;
use http::HeaderMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Decoded query string, keys and values percent-decoded, order kept.
pub(crate) type QueryPairs = Vec<(String, String)>;

/// Parse a raw query string (without the leading `?`).
pub(crate) fn parse_query_params(query: Option<&str>) -> QueryPairs {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse every `Cookie` header into name/value pairs. Later cookies win.
pub(crate) fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|c| c.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Convert a primitive string according to the schema type.
///
/// Values that do not convert stay strings so the schema reports the
/// type mismatch.
pub(crate) fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
    match schema.and_then(primary_type) {
        Some("integer") => val
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| val.parse::<u64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(val.to_string())),
        Some("number") => val
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(val.to_string())),
        Some("boolean") => val
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(val.to_string())),
        _ => Value::String(val.to_string()),
    }
}

fn property_schema<'a>(schema: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    schema?.get("properties")?.get(name)
}

fn array_delimiter(style: ParameterStyle, explode: bool) -> char {
    match style {
        ParameterStyle::SpaceDelimited => ' ',
        ParameterStyle::PipeDelimited => '|',
        ParameterStyle::Label if explode => '.',
        _ => ',',
    }
}

/// Decode a serialized parameter value according to its schema and style.
///
/// `value` has already had any label (`.`) or matrix (`;name=`) prefix
/// removed.
pub(crate) fn decode_param_value(
    value: &str,
    schema: Option<&Value>,
    style: ParameterStyle,
    explode: bool,
) -> Value {
    match schema.and_then(primary_type) {
        Some("array") => {
            let items_schema = schema.and_then(|s| s.get("items"));
            let parts = value
                .split(array_delimiter(style, explode))
                .filter(|s| !s.is_empty())
                .map(|p| convert_primitive(p.trim(), items_schema))
                .collect::<Vec<_>>();
            Value::Array(parts)
        }
        Some("object") => decode_object(value, schema, style, explode),
        _ => convert_primitive(value, schema),
    }
}

/// Objects serialize as `k,v,k,v` or, exploded, `k=v,k=v`. JSON text is
/// accepted as well.
fn decode_object(value: &str, schema: Option<&Value>, style: ParameterStyle, explode: bool) -> Value {
    if value.trim_start().starts_with('{') {
        if let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(value) {
            return parsed;
        }
    }

    let delim = array_delimiter(style, explode);
    let mut object = Map::new();
    if explode {
        for pair in value.split(delim).filter(|s| !s.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            object.insert(k.to_string(), convert_primitive(v, property_schema(schema, k)));
        }
    } else {
        let parts: Vec<&str> = value.split(delim).collect();
        if parts.len() % 2 != 0 {
            return Value::String(value.to_string());
        }
        for kv in parts.chunks(2) {
            object.insert(
                kv[0].to_string(),
                convert_primitive(kv[1], property_schema(schema, kv[0])),
            );
        }
    }
    Value::Object(object)
}

/// Strip the style prefix from a path parameter value.
///
/// Label values start with `.`; matrix values with `;name=` (or, for
/// exploded arrays and objects, one `;key=` per entry).
fn strip_path_style(raw: &str, param: &ParameterMeta) -> Option<String> {
    let explode = param.effective_explode();
    match param.effective_style() {
        ParameterStyle::Label => raw.strip_prefix('.').map(str::to_string),
        ParameterStyle::Matrix => {
            let rest = raw.strip_prefix(';')?;
            let is_object = param.schema.as_ref().and_then(|s| s.primary_type()) == Some("object");
            if explode && is_object {
                // ;role=admin;name=alex -> role=admin,name=alex
                return Some(rest.replace(';', ","));
            }
            let prefix = format!("{}=", param.name);
            if explode {
                let values: Option<Vec<&str>> =
                    rest.split(';').map(|entry| entry.strip_prefix(prefix.as_str())).collect();
                return values.map(|v| v.join(","));
            }
            rest.strip_prefix(prefix.as_str()).map(str::to_string)
        }
        _ => Some(raw.to_string()),
    }
}

fn parameter_error(param: &ParameterMeta, reason: impl Into<String>) -> ValidationError {
    ValidationError::Parameter {
        name: param.name.clone(),
        location: param.location.to_string(),
        reason: reason.into(),
    }
}

/// Request data the parameters are read from.
pub(crate) struct ParameterSources<'a> {
    pub route: &'a RouteMatch,
    pub query: QueryPairs,
    pub headers: &'a HeaderMap,
    pub cookies: HashMap<String, String>,
}

impl<'a> ParameterSources<'a> {
    pub(crate) fn new(route: &'a RouteMatch, query: Option<&str>, headers: &'a HeaderMap) -> Self {
        Self {
            route,
            query: parse_query_params(query),
            headers,
            cookies: parse_cookies(headers),
        }
    }

    fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Decoded value of `param`, `None` when it is absent from the request.
    fn extract(&self, param: &ParameterMeta) -> Result<Option<Value>, ValidationError> {
        let schema = param.schema.as_ref().map(|s| s.schema());
        let style = param.effective_style();
        let explode = param.effective_explode();

        match param.location {
            ParameterLocation::Path => {
                let Some(raw) = self.route.get_path_param(&param.name) else {
                    return Ok(None);
                };
                let stripped = strip_path_style(raw, param).ok_or_else(|| {
                    parameter_error(param, format!("value does not follow the {style} style"))
                })?;
                Ok(Some(decode_param_value(&stripped, schema, style, explode)))
            }
            ParameterLocation::Query => Ok(self.extract_query(param, schema, style, explode)),
            ParameterLocation::Header => {
                let Some(value) = self.headers.get(param.name.as_str()) else {
                    return Ok(None);
                };
                let value = value
                    .to_str()
                    .map_err(|_| parameter_error(param, "header value is not visible ASCII"))?;
                Ok(Some(decode_param_value(value.trim(), schema, style, explode)))
            }
            ParameterLocation::Cookie => Ok(self
                .cookies
                .get(&param.name)
                .map(|v| decode_param_value(v, schema, style, explode))),
        }
    }

    fn extract_query(
        &self,
        param: &ParameterMeta,
        schema: Option<&Value>,
        style: ParameterStyle,
        explode: bool,
    ) -> Option<Value> {
        let kind = schema.and_then(primary_type);

        if style == ParameterStyle::DeepObject {
            let prefix = format!("{}[", param.name);
            let mut object = Map::new();
            for (key, value) in &self.query {
                let Some(prop) = key
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_suffix(']'))
                else {
                    continue;
                };
                object.insert(
                    prop.to_string(),
                    convert_primitive(value, property_schema(schema, prop)),
                );
            }
            return (!object.is_empty()).then_some(Value::Object(object));
        }

        if style == ParameterStyle::Form && explode {
            match kind {
                Some("array") => {
                    let values = self.query_values(&param.name);
                    if values.is_empty() {
                        return None;
                    }
                    let items = schema.and_then(|s| s.get("items"));
                    return Some(Value::Array(
                        values.into_iter().map(|v| convert_primitive(v, items)).collect(),
                    ));
                }
                Some("object") => {
                    // Exploded form objects spread their properties over the query
                    let properties = schema.and_then(|s| s.get("properties")).and_then(Value::as_object)?;
                    let mut object = Map::new();
                    for (key, value) in &self.query {
                        if let Some(prop_schema) = properties.get(key) {
                            object.insert(key.clone(), convert_primitive(value, Some(prop_schema)));
                        }
                    }
                    return (!object.is_empty()).then_some(Value::Object(object));
                }
                _ => {}
            }
        }

        let raw = self.query_values(&param.name).into_iter().next()?;
        Some(decode_param_value(raw, schema, style, explode))
    }
}

/// Check every declared parameter of the matched route.
pub(crate) fn validate_parameters(sources: &ParameterSources<'_>) -> Result<(), ValidationError> {
    for param in &sources.route.route.parameters {
        let Some(value) = sources.extract(param)? else {
            if param.required {
                return Err(parameter_error(param, "value is required but missing"));
            }
            continue;
        };
        if let Some(schema) = &param.schema {
            schema
                .validate(&value)
                .map_err(|reason| parameter_error(param, reason))?;
        }
    }
    Ok(())
}

//! Request body checks: presence, media type and schema.

use super::params::convert_primitive;
use super::schema::primary_type;
use crate::error::ValidationError;
use crate::spec::{media_type_essence, MediaTypeMeta, RequestBodyMeta};
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde_json::{Map, Value};

pub(crate) const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// `application/json` and structured syntax suffixes like `application/problem+json`.
pub(crate) fn is_json_media_type(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Does a declared media range accept the concrete request media type?
fn media_range_matches(range: &str, media_type: &str) -> bool {
    if range == "*/*" || range == media_type {
        return true;
    }
    match (range.split_once('/'), media_type.split_once('/')) {
        (Some((range_type, "*")), Some((actual_type, _))) => range_type == actual_type,
        _ => false,
    }
}

/// Pick the declared media type for a request: exact match first, then
/// `type/*`, then `*/*`.
fn select_media_type<'a>(
    body: &'a RequestBodyMeta,
    content_type: Option<&str>,
) -> Result<Option<&'a MediaTypeMeta>, ValidationError> {
    if body.content.is_empty() {
        return Ok(None);
    }
    let Some(content_type) = content_type else {
        if let [only] = body.content.as_slice() {
            return Ok(Some(only));
        }
        return Err(ValidationError::body("header Content-Type is missing"));
    };

    let exact = body.content.iter().find(|m| m.media_type == content_type);
    let wildcard = || {
        body.content
            .iter()
            .filter(|m| m.media_type != "*/*")
            .find(|m| media_range_matches(&m.media_type, content_type))
    };
    let any = || body.content.iter().find(|m| m.media_type == "*/*");

    exact
        .or_else(wildcard)
        .or_else(any)
        .map(Some)
        .ok_or_else(|| {
            ValidationError::body(format!(
                "header Content-Type has unexpected value \"{content_type}\""
            ))
        })
}

/// Decode a form body into an object, coercing values by property schema.
///
/// Repeated keys collect into an array when the property is an array.
pub(crate) fn decode_form_body(data: &[u8], schema: Option<&Value>) -> Value {
    let properties = schema.and_then(|s| s.get("properties"));
    let mut object = Map::new();
    for (key, value) in url::form_urlencoded::parse(data) {
        let prop_schema = properties.and_then(|p| p.get(&*key));
        if prop_schema.and_then(primary_type) == Some("array") {
            let items = prop_schema.and_then(|s| s.get("items"));
            let entry = object
                .entry(key.into_owned())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(convert_primitive(&value, items));
            }
        } else {
            object.insert(key.into_owned(), convert_primitive(&value, prop_schema));
        }
    }
    Value::Object(object)
}

/// Validate the body of a request against the operation's `requestBody`.
pub(crate) fn validate_body(
    body_meta: Option<&RequestBodyMeta>,
    headers: &HeaderMap,
    data: &[u8],
) -> Result<(), ValidationError> {
    let Some(body_meta) = body_meta else {
        return Ok(());
    };

    if data.is_empty() {
        if body_meta.required {
            return Err(ValidationError::body("value is required but missing"));
        }
        return Ok(());
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type_essence)
        .filter(|ct| !ct.is_empty());

    let Some(media) = select_media_type(body_meta, content_type.as_deref())? else {
        return Ok(());
    };
    let effective = content_type.as_deref().unwrap_or(&media.media_type);

    let instance = if is_json_media_type(effective) {
        serde_json::from_slice::<Value>(data)
            .map_err(|e| ValidationError::body(format!("invalid JSON: {e}")))?
    } else if effective == FORM_URLENCODED {
        decode_form_body(data, media.schema.as_ref().map(|s| s.schema()))
    } else {
        return Ok(());
    };

    match &media.schema {
        Some(schema) => schema.validate(&instance).map_err(ValidationError::body),
        None => Ok(()),
    }
}

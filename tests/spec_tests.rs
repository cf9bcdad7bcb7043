#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::temp_files::{create_temp_json, create_temp_spec, create_temp_yaml};
use common::PETSTORE_YAML;
use http::Method;
use specguard::spec::{build_routes, ParameterLocation, Specification};
use specguard::{GuardError, LoadError, ParseError};

#[test]
fn test_load_yaml_file() {
    let file = create_temp_yaml(PETSTORE_YAML);
    let spec = Specification::from_file(file.path()).unwrap();
    assert_eq!(spec.title(), "Pet Store");
    assert_eq!(spec.source(), Some(file.path()));
    assert_eq!(spec.document()["openapi"], "3.0.3");
}

#[test]
fn test_load_json_file() {
    let json = r#"{
      "openapi": "3.1.0",
      "info": {"title": "Json API", "version": "1"},
      "paths": {"/ping": {"get": {"responses": {"200": {"description": "pong"}}}}}
    }"#;
    let file = create_temp_json(json);
    let spec = Specification::from_file(file.path()).unwrap();
    assert_eq!(spec.title(), "Json API");
    assert_eq!(build_routes(&spec).unwrap().len(), 1);
}

#[test]
fn test_unknown_extension_is_sniffed() {
    let file = create_temp_spec(PETSTORE_YAML, "txt");
    assert_eq!(Specification::from_file(file.path()).unwrap().title(), "Pet Store");
}

#[test]
fn test_from_bytes_rejects_non_openapi_3() {
    let err = Specification::from_bytes(b"swagger: '2.0'\ninfo: {title: x, version: '1'}\n").unwrap_err();
    assert!(matches!(err, ParseError::MissingVersion));

    let err = Specification::from_bytes(b"openapi: 2.0.0\ninfo: {title: x, version: '1'}\n").unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedVersion(ref v) if v == "2.0.0"));

    let err = Specification::from_bytes(b"- just\n- a list\n").unwrap_err();
    assert!(matches!(err, ParseError::NotAnObject));
}

#[test]
fn test_from_bytes_rejects_model_mismatch() {
    let err = Specification::from_bytes(b"openapi: 3.1.0\ninfo: {version: '1'}\npaths: {}\n").unwrap_err();
    assert!(matches!(err, ParseError::Model(_)), "unexpected error: {err:?}");
}

#[test]
fn test_directory_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Specification::from_file(dir.path()).unwrap_err();
    assert!(matches!(err, GuardError::Load { source: LoadError::Io(_), .. }));
}

#[test]
fn test_routes_extracted_from_petstore() {
    let spec = Specification::from_bytes(PETSTORE_YAML.as_bytes()).unwrap();
    let routes = build_routes(&spec).unwrap();

    let mut ops: Vec<(Method, String)> = routes
        .iter()
        .map(|r| (r.method.clone(), r.path_pattern.to_string()))
        .collect();
    ops.sort_by(|a, b| (a.1.as_str(), a.0.as_str()).cmp(&(b.1.as_str(), b.0.as_str())));
    assert_eq!(
        ops,
        vec![
            (Method::GET, "/pets".to_string()),
            (Method::POST, "/pets".to_string()),
            (Method::GET, "/pets/mine".to_string()),
            (Method::DELETE, "/pets/{petId}".to_string()),
            (Method::GET, "/pets/{petId}".to_string()),
            (Method::PUT, "/pets/{petId}".to_string()),
        ]
    );

    let delete = routes
        .iter()
        .find(|r| r.operation_id.as_deref() == Some("deletePet"))
        .unwrap();
    // Path-level $ref parameter merged with the operation's own header
    assert_eq!(delete.parameters.len(), 2);
    let pet_id = delete.parameters.iter().find(|p| p.name == "petId").unwrap();
    assert_eq!(pet_id.location, ParameterLocation::Path);
    assert!(pet_id.required);
    assert!(pet_id.schema.is_some());
    let key = delete.parameters.iter().find(|p| p.name == "X-Api-Key").unwrap();
    assert_eq!(key.location, ParameterLocation::Header);

    let create = routes
        .iter()
        .find(|r| r.operation_id.as_deref() == Some("createPet"))
        .unwrap();
    let body = create.request_body.as_ref().unwrap();
    assert!(body.required);
    let media: Vec<&str> = body.content.iter().map(|m| m.media_type.as_str()).collect();
    assert!(media.contains(&"application/json"));
    assert!(media.contains(&"application/x-www-form-urlencoded"));
}

#[test]
fn test_nullable_rewritten_in_compiled_schema() {
    let spec = Specification::from_bytes(PETSTORE_YAML.as_bytes()).unwrap();
    assert_eq!(
        spec.normalized()["components"]["schemas"]["NewPet"]["properties"]["tag"]["type"],
        serde_json::json!(["string", "null"])
    );
    let routes = build_routes(&spec).unwrap();
    let create = routes
        .iter()
        .find(|r| r.operation_id.as_deref() == Some("createPet"))
        .unwrap();
    let schema = create.request_body.as_ref().unwrap().content[0]
        .schema
        .as_ref()
        .unwrap();
    assert!(schema.validate(&serde_json::json!({"name": "Rex", "tag": null})).is_ok());
}

#[test]
fn test_unknown_path_item_keys_ignored() {
    let spec = r#"
openapi: 3.1.0
info: { title: Odd, version: "1" }
paths:
  /odd:
    x-internal: true
    copy:
      responses: { "200": { description: ok } }
    get:
      responses: { "200": { description: ok } }
"#;
    let spec = Specification::from_bytes(spec.as_bytes()).unwrap();
    assert!(spec.document()["paths"]["/odd"].get("copy").is_some());
    assert!(spec.normalized()["paths"]["/odd"].get("copy").is_none());
    assert_eq!(build_routes(&spec).unwrap().len(), 1);
}

#[test]
fn test_schema_that_does_not_compile_is_an_index_error() {
    let spec = r#"
openapi: 3.1.0
info: { title: Bad schema, version: "1" }
paths:
  /bad:
    get:
      parameters:
        - name: q
          in: query
          schema:
            type: string
            pattern: "(unclosed"
      responses: { "200": { description: ok } }
"#;
    let spec = Specification::from_bytes(spec.as_bytes()).unwrap();
    let err = build_routes(&spec).unwrap_err();
    assert!(err.to_string().contains("GET /bad"), "unexpected message: {err}");
}

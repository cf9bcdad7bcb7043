#![allow(dead_code)]

use http::{HeaderValue, Request};
use specguard::ValidatingMiddleware;
use std::cell::Cell;

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary file with the given extension.
    ///
    /// The file is removed when the returned handle is dropped.
    pub fn create_temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("specguard_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_spec(content, "json")
    }
}

/// OpenAPI 3.0 pet store used across the integration tests.
pub const PETSTORE_YAML: &str = r##"openapi: 3.0.3
info:
  title: Pet Store
  version: 1.0.0
servers:
  - url: http://localhost/v1
  - url: https://api.petstore.test/v1
components:
  schemas:
    NewPet:
      type: object
      required: [name]
      properties:
        name:
          type: string
          minLength: 1
        tag:
          type: string
          nullable: true
        age:
          type: integer
          minimum: 0
    Pet:
      allOf:
        - $ref: '#/components/schemas/NewPet'
        - type: object
          required: [id]
          properties:
            id:
              type: integer
  parameters:
    PetId:
      name: petId
      in: path
      required: true
      schema:
        type: integer
        minimum: 1
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            minimum: 1
            maximum: 100
        - name: tags
          in: query
          style: form
          explode: false
          schema:
            type: array
            items:
              type: string
      responses:
        '200':
          description: A list of pets
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewPet'
          application/x-www-form-urlencoded:
            schema:
              $ref: '#/components/schemas/NewPet'
      responses:
        '201':
          description: Created
  /pets/mine:
    get:
      operationId: listMyPets
      parameters:
        - name: session
          in: cookie
          required: true
          schema:
            type: string
      responses:
        '200':
          description: My pets
  /pets/{petId}:
    parameters:
      - $ref: '#/components/parameters/PetId'
    get:
      operationId: showPetById
      responses:
        '200':
          description: A pet
    put:
      operationId: replacePet
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '200':
          description: Replaced
    delete:
      operationId: deletePet
      parameters:
        - name: X-Api-Key
          in: header
          required: true
          schema:
            type: string
      responses:
        '204':
          description: Deleted
"##;

pub fn petstore() -> ValidatingMiddleware {
    ValidatingMiddleware::from_bytes(PETSTORE_YAML.as_bytes()).unwrap()
}

/// Request to the first server, with a `Host` header like a real client sends.
pub fn request(method: &str, path_and_query: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(format!("/v1{path_and_query}"))
        .header(http::header::HOST, HeaderValue::from_static("localhost"))
}

pub fn get(path_and_query: &str) -> Request<Vec<u8>> {
    request("GET", path_and_query).body(Vec::new()).unwrap()
}

/// Next handler that records how often it ran.
pub struct Sentinel {
    pub calls: Cell<usize>,
}

impl Sentinel {
    pub fn new() -> Self {
        Self { calls: Cell::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

/// Run `req` through the middleware with a sentinel that answers 299.
pub fn run(
    guard: &ValidatingMiddleware,
    req: Request<Vec<u8>>,
    sentinel: &Sentinel,
) -> http::Response<Vec<u8>> {
    guard.handle(req, |_req| {
        sentinel.calls.set(sentinel.calls.get() + 1);
        http::Response::builder()
            .status(299)
            .body(b"from next".to_vec())
            .unwrap()
    })
}

pub fn body_text(res: &http::Response<Vec<u8>>) -> String {
    String::from_utf8(res.body().clone()).unwrap()
}

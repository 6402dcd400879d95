//! OpenAPI 3.1 document types and the route table generator.
//!
//! Schemas are carried as plain JSON Schema values, which is what OpenAPI
//! 3.1 embeds: <https://spec.openapis.org/oas/v3.1.0>

use http::{Method, StatusCode};
use indexmap::{IndexMap, IndexSet};
use openproc_core::{RouteDefinition, RouteTable, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DocsError, DocsResult};
use crate::schema::{error_response_schema, json_schema, ERROR_SCHEMA_NAME};

/// OpenAPI version written into every document.
pub const OPENAPI_VERSION: &str = "3.1.0";

/// Document root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApi {
    /// OpenAPI version.
    pub openapi: String,
    /// API metadata.
    pub info: Info,
    /// Base URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Operations by OpenAPI path.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Shared schemas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Tags in first-use order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// API metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Base URL.
    pub url: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Operations on one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: &Method) -> Option<&mut Option<Operation>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::PUT => Some(&mut self.put),
            Method::POST => Some(&mut self.post),
            Method::DELETE => Some(&mut self.delete),
            Method::PATCH => Some(&mut self.patch),
            _ => None,
        }
    }

    /// Returns the operation for a method, if documented.
    #[must_use]
    pub fn operation(&self, method: &Method) -> Option<&Operation> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            _ => None,
        }
    }
}

/// One documented route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// The procedure id.
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Path and query parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code.
    pub responses: IndexMap<String, Response>,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
}

/// An operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Parameter schema.
    pub schema: Value,
}

/// Request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Content by media type.
    pub content: IndexMap<String, MediaType>,
}

/// Media type content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    /// Body schema.
    pub schema: Value,
}

/// Response definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Description (required by OpenAPI).
    pub description: String,
    /// Content by media type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// Reusable components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    /// Reusable schemas.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Value>,
}

/// API tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
}

/// Builds an OpenAPI document from a route table.
///
/// # Example
///
/// ```
/// use openproc_core::{RouteDefinition, RouteTable, Schema};
/// use openproc_docs::OpenApiGenerator;
///
/// let routes = RouteTable::new([RouteDefinition::get("/users/{id}", "getUser")
///     .input(Schema::object().field("id", Schema::integer()))
///     .build()
///     .unwrap()])
/// .unwrap();
///
/// let doc = OpenApiGenerator::new().title("Users").version("1.0.0").generate(&routes).unwrap();
/// let op = doc.paths["/users/{id}"].get.as_ref().unwrap();
/// assert_eq!(op.operation_id, "getUser");
/// ```
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    title: String,
    version: String,
    description: Option<String>,
    servers: Vec<Server>,
    default_content_types: Vec<String>,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiGenerator {
    /// Creates a generator with a placeholder title and version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.0.0".to_string(),
            description: None,
            servers: Vec::new(),
            default_content_types: vec!["application/json".to_string()],
        }
    }

    /// Sets the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a server, typically the deployment URL plus base path.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Media types documented for body routes that do not restrict theirs.
    #[must_use]
    pub fn default_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Generates the document. Disabled routes are left out.
    pub fn generate(&self, routes: &RouteTable) -> DocsResult<OpenApi> {
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut tags: IndexSet<String> = IndexSet::new();

        for route in routes.routes().filter(|r| r.is_enabled()) {
            let path = route.template().to_openapi();
            let operation = self.operation(route);
            tags.extend(operation.tags.iter().cloned());

            let slot = paths
                .entry(path.clone())
                .or_default()
                .slot(route.method())
                .ok_or_else(|| DocsError::InvalidOperation {
                    operation_id: route.procedure_id().to_string(),
                    reason: format!("unsupported method {}", route.method()),
                })?;
            if slot.is_some() {
                return Err(DocsError::DuplicateOperation {
                    method: route.method().to_string(),
                    path,
                });
            }
            *slot = Some(operation);
        }

        let mut schemas = IndexMap::new();
        schemas.insert(ERROR_SCHEMA_NAME.to_string(), error_response_schema());

        Ok(OpenApi {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: self.title.clone(),
                version: self.version.clone(),
                description: self.description.clone(),
            },
            servers: self.servers.clone(),
            paths,
            components: Some(Components { schemas }),
            tags: tags.into_iter().map(|name| Tag { name }).collect(),
        })
    }

    /// Generates the document as pretty-printed JSON.
    pub fn generate_json(&self, routes: &RouteTable) -> DocsResult<String> {
        let doc = self.generate(routes)?;
        serde_json::to_string_pretty(&doc).map_err(DocsError::from)
    }

    fn operation(&self, route: &RouteDefinition) -> Operation {
        let metadata = route.metadata();
        let path_params: Vec<&str> = route.template().param_names().collect();
        let input = route.input_schema();

        let mut parameters: Vec<Parameter> = path_params
            .iter()
            .map(|name| Parameter {
                name: (*name).to_string(),
                location: ParameterIn::Path,
                description: None,
                required: true,
                schema: input
                    .and_then(|s| s.property_schema(name))
                    .map_or_else(|| json!({"type": "string"}), json_schema),
            })
            .collect();

        let mut request_body = None;
        if route.reads_body() {
            request_body = input.and_then(|schema| self.request_body(route, schema, &path_params));
        } else if let Some(Schema::Object { properties, .. }) = input.map(Schema::non_null) {
            parameters.extend(
                properties
                    .iter()
                    .filter(|(name, _)| !path_params.contains(&name.as_str()))
                    .map(|(name, property)| Parameter {
                        name: name.clone(),
                        location: ParameterIn::Query,
                        description: None,
                        required: property.required,
                        schema: json_schema(&property.schema),
                    }),
            );
        }

        Operation {
            operation_id: route.procedure_id().to_string(),
            summary: metadata.summary.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            deprecated: metadata.deprecated,
            parameters,
            request_body,
            responses: responses(route),
        }
    }

    fn request_body(
        &self,
        route: &RouteDefinition,
        schema: &Schema,
        path_params: &[&str],
    ) -> Option<RequestBody> {
        let (body_schema, required) = match schema.non_null() {
            Schema::Object {
                properties,
                additional_properties,
            } => {
                let mut remaining = properties.clone();
                remaining.retain(|name, _| !path_params.contains(&name.as_str()));
                if remaining.is_empty() && !additional_properties {
                    return None;
                }
                let required = remaining.values().any(|p| p.required);
                let body = Schema::Object {
                    properties: remaining,
                    additional_properties: *additional_properties,
                };
                (json_schema(&body), required)
            }
            _ => (json_schema(schema), true),
        };

        let types = route
            .content_types()
            .map_or(self.default_content_types.as_slice(), |types| types);
        let content = types
            .iter()
            .map(|media| {
                (
                    media.clone(),
                    MediaType {
                        schema: body_schema.clone(),
                    },
                )
            })
            .collect();

        Some(RequestBody { required, content })
    }
}

fn responses(route: &RouteDefinition) -> IndexMap<String, Response> {
    let mut responses = IndexMap::new();

    let status = route.success_status();
    let mut content = IndexMap::new();
    if status != StatusCode::NO_CONTENT {
        let schema = route.output_schema().map_or_else(|| json!({}), json_schema);
        content.insert("application/json".to_string(), MediaType { schema });
    }
    responses.insert(
        status.as_str().to_string(),
        Response {
            description: status
                .canonical_reason()
                .unwrap_or("Successful response")
                .to_string(),
            content,
        },
    );

    let mut errors = vec![StatusCode::BAD_REQUEST];
    if route.reads_body() {
        errors.extend([StatusCode::PAYLOAD_TOO_LARGE, StatusCode::UNSUPPORTED_MEDIA_TYPE]);
    }
    errors.push(StatusCode::INTERNAL_SERVER_ERROR);

    for status in errors {
        responses.insert(status.as_str().to_string(), error_response(status));
    }
    responses
}

fn error_response(status: StatusCode) -> Response {
    let mut content = IndexMap::new();
    content.insert(
        "application/json".to_string(),
        MediaType {
            schema: json!({"$ref": format!("#/components/schemas/{ERROR_SCHEMA_NAME}")}),
        },
    );
    Response {
        description: status.canonical_reason().unwrap_or("Error").to_string(),
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> RouteTable {
        RouteTable::new([
            RouteDefinition::get("/users/{id}", "getUser")
                .input(
                    Schema::object()
                        .field("id", Schema::integer())
                        .optional("expand", Schema::boolean()),
                )
                .output(Schema::object().field("id", Schema::integer()))
                .tag("users")
                .summary("Fetch a user")
                .build()
                .unwrap(),
            RouteDefinition::post("/users/{id}/notes", "addNote")
                .input(
                    Schema::object()
                        .field("id", Schema::integer())
                        .field("text", Schema::string()),
                )
                .status(StatusCode::CREATED)
                .content_types(["application/json", "application/x-www-form-urlencoded"])
                .tag("notes")
                .tag("users")
                .build()
                .unwrap(),
            RouteDefinition::delete("/users/{id}", "deleteUser")
                .input(Schema::object().field("id", Schema::integer()))
                .status(StatusCode::NO_CONTENT)
                .deprecated()
                .build()
                .unwrap(),
            RouteDefinition::get("/internal/stats", "stats")
                .disabled()
                .build()
                .unwrap(),
            RouteDefinition::get("/files/{path+}", "getFile")
                .input(Schema::object().field("path", Schema::string()))
                .build()
                .unwrap(),
        ])
        .unwrap()
    }

    fn generate() -> OpenApi {
        OpenApiGenerator::new()
            .title("Test API")
            .version("1.0.0")
            .generate(&routes())
            .unwrap()
    }

    #[test]
    fn test_get_splits_path_and_query() {
        let doc = generate();
        let op = doc.paths["/users/{id}"].get.as_ref().unwrap();

        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters[0].name, "id");
        assert_eq!(op.parameters[0].location, ParameterIn::Path);
        assert!(op.parameters[0].required);
        assert_eq!(op.parameters[0].schema, json!({"type": "integer"}));
        assert_eq!(op.parameters[1].name, "expand");
        assert_eq!(op.parameters[1].location, ParameterIn::Query);
        assert!(!op.parameters[1].required);
        assert!(op.request_body.is_none());
        assert_eq!(op.summary.as_deref(), Some("Fetch a user"));
    }

    #[test]
    fn test_body_excludes_path_params() {
        let doc = generate();
        let op = doc.paths["/users/{id}/notes"].post.as_ref().unwrap();
        let body = op.request_body.as_ref().unwrap();

        assert!(body.required);
        assert_eq!(
            body.content.keys().collect::<Vec<_>>(),
            vec!["application/json", "application/x-www-form-urlencoded"]
        );
        let schema = &body.content["application/json"].schema;
        assert!(schema["properties"].get("id").is_none());
        assert_eq!(schema["required"], json!(["text"]));
        assert_eq!(op.parameters.len(), 1);
    }

    #[test]
    fn test_declared_status_and_error_responses() {
        let doc = generate();
        let op = doc.paths["/users/{id}/notes"].post.as_ref().unwrap();

        let codes: Vec<&str> = op.responses.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["201", "400", "413", "415", "500"]);
        assert_eq!(
            op.responses["400"].content["application/json"].schema,
            json!({"$ref": "#/components/schemas/OpenApiErrorResponse"})
        );

        let get = doc.paths["/users/{id}"].get.as_ref().unwrap();
        assert_eq!(
            get.responses["200"].content["application/json"].schema,
            json!({
                "type": "object",
                "properties": {"id": {"type": "integer"}},
                "required": ["id"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn test_no_content_has_no_body() {
        let doc = generate();
        let op = doc.paths["/users/{id}"].delete.as_ref().unwrap();

        assert!(op.deprecated);
        assert!(op.responses["204"].content.is_empty());
    }

    #[test]
    fn test_disabled_routes_are_omitted() {
        let doc = generate();
        assert!(!doc.paths.contains_key("/internal/stats"));
    }

    #[test]
    fn test_catch_all_is_rendered_as_param() {
        let doc = generate();
        let op = doc.paths["/files/{path}"].get.as_ref().unwrap();
        assert_eq!(op.parameters[0].location, ParameterIn::Path);
    }

    #[test]
    fn test_tags_in_first_use_order() {
        let doc = generate();
        let names: Vec<&str> = doc.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "notes"]);
    }

    #[test]
    fn test_error_schema_component() {
        let doc = generate();
        let components = doc.components.unwrap();
        assert!(components.schemas.contains_key(ERROR_SCHEMA_NAME));
    }

    #[test]
    fn test_json_output() {
        let json = OpenApiGenerator::new()
            .server("https://api.example.com/v1", None)
            .generate_json(&routes())
            .unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["openapi"], "3.1.0");
        assert_eq!(value["servers"][0]["url"], "https://api.example.com/v1");
        assert_eq!(value["paths"]["/users/{id}"]["get"]["operationId"], "getUser");
        assert_eq!(value["paths"]["/users/{id}"]["delete"]["deprecated"], true);
    }
}

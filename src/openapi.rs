//! OpenAPI document types and generation.
//!
//! [`OpenApiGenerator::generate`] walks a [`Router`]'s route descriptors and
//! produces an OpenAPI 3.0 document describing every documented route:
//! parameters, bodies, the success response, the failures the error mapper
//! and route groups declare, and the security requirement of gated routes.
//!
//! Everything is stored in insertion-ordered maps, so the same route table
//! always serializes to the same bytes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConditionKind;
use crate::middleware::errors::Problem;
use crate::response::ContentType;
use crate::router::{RouteDescriptor, Router};
use crate::schema::{ApiSchema, Schema, SchemaRegistry};

/// Name of the security scheme gated routes require.
pub const BASIC_AUTH_SCHEME: &str = "basicAuth";

// ── Handler signatures ────────────────────────────────────────────────────────

/// The documented shape of one handler, derived from its argument and
/// output types.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub request_body: Option<Content>,
    pub response: Option<Content>,
    /// The handler extracts a [`Principal`](crate::Principal).
    pub requires_principal: bool,
}

/// A body schema with its content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub content_type: ContentType,
    pub schema: Schema,
}

impl Content {
    pub fn new(content_type: ContentType, schema: Schema) -> Self {
        Self { content_type, schema }
    }

    fn into_media(self) -> IndexMap<String, MediaType> {
        let mut content = IndexMap::new();
        content.insert(self.content_type.media_type().to_owned(), MediaType { schema: Some(self.schema) });
        content
    }
}

// ── Document types ────────────────────────────────────────────────────────────

/// OpenAPI document root object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApi {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// API metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Operations available on one path template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: crate::Method) -> &mut Option<Operation> {
        use crate::Method;
        match method {
            Method::Delete  => &mut self.delete,
            Method::Get     => &mut self.get,
            Method::Head    => &mut self.head,
            Method::Options => &mut self.options,
            Method::Patch   => &mut self.patch,
            Method::Post    => &mut self.post,
            Method::Put     => &mut self.put,
        }
    }

    /// Every operation on this path, in a fixed method order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        [&self.get, &self.put, &self.post, &self.delete, &self.options, &self.head, &self.patch]
            .into_iter()
            .flatten()
    }
}

/// One documented endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, ApiResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    Query,
    Path,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterIn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl Parameter {
    /// A parameter whose description is lifted from its property schema.
    pub fn new(name: String, location: ParameterIn, required: bool, mut schema: Schema) -> Self {
        let description = schema.description.take();
        Self { name, location, description, required, schema: Some(schema) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub description: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Scheme name → required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

// ── Generator ─────────────────────────────────────────────────────────────────

/// Builds an [`OpenApi`] document from a router.
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    info: Info,
    servers: Vec<Server>,
}

impl OpenApiGenerator {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Info { title: title.into(), version: version.into(), description: None },
            servers: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    pub fn server(mut self, url: impl Into<String>, description: impl Into<String>) -> Self {
        self.servers.push(Server { url: url.into(), description: Some(description.into()) });
        self
    }

    /// Describes every documented route of `router`.
    pub fn generate(&self, router: &Router) -> OpenApi {
        let mut registry = SchemaRegistry::new();
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut gated = false;

        for descriptor in router.descriptors().filter(|d| d.documented) {
            gated |= descriptor.auth;
            let operation = self.operation(router, descriptor, &mut registry);
            let slot = paths.entry(descriptor.path.clone()).or_default().slot(descriptor.method);
            debug_assert!(slot.is_none(), "route {} {} described twice", descriptor.method, descriptor.path);
            *slot = Some(operation);
        }

        let mut components = Components { schemas: registry.into_schemas(), ..Default::default() };
        if gated {
            components.security_schemes.insert(
                BASIC_AUTH_SCHEME.to_owned(),
                SecurityScheme {
                    scheme_type: "http".to_owned(),
                    scheme: Some("basic".to_owned()),
                    description: router.authenticator().map(|gate| format!("Realm: {}", gate.realm())),
                },
            );
        }

        OpenApi {
            openapi: "3.0.3".to_owned(),
            info: self.info.clone(),
            servers: self.servers.clone(),
            paths,
            components: Some(components),
        }
    }

    fn operation(&self, router: &Router, descriptor: &RouteDescriptor, registry: &mut SchemaRegistry) -> Operation {
        let signature = (descriptor.signature)(registry);

        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_owned(),
            ApiResponse {
                description: "OK".to_owned(),
                content: signature.response.map(Content::into_media).unwrap_or_default(),
            },
        );

        let mapper = router.error_mapper();
        let scoped = descriptor
            .failures
            .iter()
            .map(|failure| (failure.kind, failure.description.as_str()));
        let global = mapper.documented().map(|rule| (rule.kind, rule.description));
        for (kind, description) in scoped.chain(global) {
            // Failures resolve their status through the mapper, so only real mappings are described.
            let Some(status) = mapper.status_of(kind) else { continue };
            responses
                .entry(status.as_str().to_owned())
                .or_insert_with(|| failure_response(kind, description, registry));
        }

        let mut security = Vec::new();
        if descriptor.auth {
            responses
                .entry(http::StatusCode::UNAUTHORIZED.as_str().to_owned())
                .or_insert_with(|| ApiResponse {
                    description: "Missing or invalid credentials.".to_owned(),
                    content: IndexMap::new(),
                });
            security.push(IndexMap::from([(BASIC_AUTH_SCHEME.to_owned(), Vec::new())]));
        }

        Operation {
            operation_id: operation_id(descriptor),
            summary: descriptor.info.summary.clone(),
            description: descriptor.info.description.clone(),
            parameters: signature.parameters,
            request_body: signature.request_body.map(|body| RequestBody {
                description: None,
                required: true,
                content: body.into_media(),
            }),
            responses,
            security,
        }
    }
}

fn failure_response(kind: ConditionKind, description: &str, registry: &mut SchemaRegistry) -> ApiResponse {
    let content = match kind {
        ConditionKind::MalformedInput | ConditionKind::NotFound => {
            Content::new(ContentType::Json, Problem::schema(registry)).into_media()
        }
        ConditionKind::Unauthenticated | ConditionKind::Unexpected => IndexMap::new(),
    };
    ApiResponse { description: description.to_owned(), content }
}

/// `GET /cars/{id}` → `get_cars_id`.
fn operation_id(descriptor: &RouteDescriptor) -> String {
    let mut id = descriptor.method.as_lowercase().to_owned();
    for segment in descriptor.path.split('/').filter(|s| !s.is_empty()) {
        id.push('_');
        id.extend(segment.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_'));
    }
    id
}

// ── Swagger UI ────────────────────────────────────────────────────────────────

/// A Swagger UI page that loads the document from the `url` query parameter,
/// falling back to `default_spec_url`.
pub fn swagger_ui_html(title: &str, default_spec_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    const url = new URLSearchParams(window.location.search).get("url") || "{default_spec_url}";
    window.ui = SwaggerUIBundle({{ url, dom_id: "#swagger-ui", deepLinking: true }});
  </script>
</body>
</html>
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use crate::router::Info as RouteInfo;

    fn descriptor(method: Method, path: &str) -> RouteDescriptor {
        RouteDescriptor {
            method,
            path: path.to_owned(),
            info: RouteInfo::new("s", "d"),
            auth: false,
            documented: true,
            failures: Vec::new(),
            signature: |_| Signature::default(),
        }
    }

    #[test]
    fn operation_ids_are_path_derived() {
        assert_eq!(operation_id(&descriptor(Method::Get, "/cars/{id}")), "get_cars_id");
        assert_eq!(operation_id(&descriptor(Method::Post, "/cars")), "post_cars");
    }

    #[test]
    fn parameters_take_their_description_from_the_schema() {
        let parameter = Parameter::new(
            "id".to_owned(),
            ParameterIn::Path,
            true,
            Schema::string().with_description("The ID of a car."),
        );
        assert_eq!(parameter.description.as_deref(), Some("The ID of a car."));
        assert_eq!(parameter.schema.and_then(|s| s.description), None);
    }

    #[test]
    fn swagger_page_points_at_the_document() {
        assert!(swagger_ui_html("Cars", "/openapi.json").contains(r#"|| "/openapi.json""#));
    }
}

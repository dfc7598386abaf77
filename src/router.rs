//! Route table and dispatch.
//!
//! One radix tree per HTTP method (O(path-length) lookup via [`matchit`]),
//! plus a list of [`RouteDescriptor`]s that the documentation generator
//! reads. Registration happens once at startup; the router is read-only
//! afterwards.
//!
//! Documented routes are declared through [`Router::api`], whose builder
//! mirrors how a resource is laid out:
//!
//! ```rust,ignore
//! Router::new()
//!     .state(cars)
//!     .api(|api| {
//!         api.route("/cars", |cars| {
//!             cars.post("", Info::new("Car data creation", "…"), create_car);
//!             cars.throws(ConditionKind::NotFound, "The requested car was not found.", |by_id| {
//!                 by_id.get("/{id}", Info::new("Car retrieval by id", "…"), get_car);
//!             });
//!             cars.authenticated(|gated| {
//!                 gated.delete("/{id}", Info::new("Car deletion", "…"), delete_car);
//!             });
//!         });
//!     })
//!     .serve_docs(generator)
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use bytes::Bytes;
use futures_util::FutureExt;
use http::{Extensions, StatusCode};
use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;

use crate::error::{ApiError, ConditionKind, InputSource};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::auth::BasicAuth;
use crate::middleware::errors::ErrorMapper;
use crate::middleware::trace::traced;
use crate::openapi::{OpenApiGenerator, Signature, swagger_ui_html};
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::schema::SchemaRegistry;

/// Where `GET /` sends browsers.
pub const DOCS_UI_PATH: &str = "/swagger-ui/index.html";
/// Where the generated document is served.
pub const OPENAPI_PATH: &str = "/openapi.json";

/// Human-readable summary and description of a documented route.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Info {
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl Info {
    pub fn new(summary: &str, description: &str) -> Self {
        Self { summary: Some(summary.to_owned()), description: Some(description.to_owned()) }
    }
}

/// A failure documented for one group of routes only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentedFailure {
    pub kind: ConditionKind,
    pub description: String,
}

/// Static metadata of one route. Created at registration, never mutated.
#[derive(Clone, Debug)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Path template, `{name}` for parameters.
    pub path: String,
    pub info: Info,
    /// Behind the auth gate.
    pub auth: bool,
    /// Part of the generated document.
    pub documented: bool,
    /// Failures documented by enclosing [`Routes::throws`] groups.
    pub failures: Vec<DocumentedFailure>,
    /// The handler's documented shape: inputs, body, output.
    pub signature: fn(&mut SchemaRegistry) -> Signature,
}

struct Endpoint {
    descriptor: RouteDescriptor,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or drive it in memory with [`Router::handle`].
pub struct Router {
    routes: HashMap<Method, MatchitRouter<usize>>,
    endpoints: Vec<Endpoint>,
    state: Extensions,
    errors: ErrorMapper,
    gate: Option<BasicAuth>,
    docs_frozen: bool,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            endpoints: Vec::new(),
            state: Extensions::new(),
            errors: ErrorMapper::new(),
            gate: None,
            docs_frozen: false,
        }
    }

    /// Register an undocumented handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them.
    pub fn on<T>(mut self, method: Method, path: &str, handler: impl Handler<T>) -> Self {
        self.add(method, path.to_owned(), Info::default(), false, false, Vec::new(), handler);
        self
    }

    /// Declare documented routes.
    ///
    /// # Panics
    ///
    /// Panics if called after [`Router::serve_docs`]: the document would no
    /// longer describe every documented route.
    pub fn api(mut self, declare: impl FnOnce(&mut Routes<'_>)) -> Self {
        assert!(!self.docs_frozen, "documented routes must be declared before serve_docs");
        let mut routes = Routes { router: &mut self, prefix: String::new(), auth: false, failures: Vec::new() };
        declare(&mut routes);
        self
    }

    /// Make `value` available to handlers through [`State<T>`](crate::State).
    pub fn state<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.state.insert(value);
        self
    }

    pub fn errors(mut self, mapper: ErrorMapper) -> Self {
        self.errors = mapper;
        self
    }

    /// The gate guarding [`Routes::authenticated`] groups.
    pub fn authentication(mut self, gate: BasicAuth) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Generate the document for every route declared so far and serve it at
    /// `/openapi.json`, with `/` redirecting to a Swagger UI page.
    pub fn serve_docs(mut self, generator: &OpenApiGenerator) -> Self {
        let document = generator.generate(&self);
        let json = match serde_json::to_vec_pretty(&document) {
            Ok(json) => Bytes::from(json),
            Err(e) => panic!("OpenAPI document does not serialize: {e}"),
        };
        let page = Bytes::from(swagger_ui_html(&document.info.title, OPENAPI_PATH));
        self.docs_frozen = true;

        let redirect_to = format!("{DOCS_UI_PATH}?url={OPENAPI_PATH}");
        self.on(Method::Get, OPENAPI_PATH, move || {
                let json = json.clone();
                async move { Response::json(json) }
            })
            .on(Method::Get, DOCS_UI_PATH, move || {
                let page = page.clone();
                async move { Response::builder().bytes(ContentType::Html, page) }
            })
            .on(Method::Get, "/", move || {
                let response = Response::redirect(&redirect_to, true);
                async move { response }
            })
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.endpoints.iter().map(|e| &e.descriptor)
    }

    pub fn error_mapper(&self) -> &ErrorMapper {
        &self.errors
    }

    pub fn authenticator(&self) -> Option<&BasicAuth> {
        self.gate.as_ref()
    }

    #[allow(clippy::too_many_arguments)]
    fn add<T>(
        &mut self,
        method: Method,
        path: String,
        info: Info,
        auth: bool,
        documented: bool,
        failures: Vec<DocumentedFailure>,
        handler: impl Handler<T>,
    ) {
        let signature = signature_of(&handler);
        if signature(&mut SchemaRegistry::new()).requires_principal && !auth {
            panic!("route `{method} {path}` extracts a principal outside an authenticated group");
        }

        let index = self.endpoints.len();
        self.routes
            .entry(method)
            .or_default()
            .insert(path.clone(), index)
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));

        self.endpoints.push(Endpoint {
            descriptor: RouteDescriptor { method, path, info, auth, documented, failures, signature },
            handler: handler.into_boxed_handler(),
        });
    }

    /// The endpoint for `method` + `path`, with its captured parameters
    /// percent-decoded. matchit hands captures over exactly as they appear
    /// in the URI.
    fn lookup(&self, method: Method, path: &str) -> Option<(&Endpoint, Result<HashMap<String, String>, ApiError>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| {
                percent_decode_str(v)
                    .decode_utf8()
                    .map(|decoded| (k.to_owned(), decoded.into_owned()))
                    .map_err(|e| ApiError::malformed(InputSource::Path, format!("parameter `{k}`: {e}")))
            })
            .collect();
        Some((&self.endpoints[*matched.value], params))
    }

    /// Routes one request and produces one response. Never fails: every
    /// condition is rendered by the error mapper.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_owned();

        traced(&parts.method, &path, async {
            let found = Method::try_from(&parts.method)
                .ok()
                .and_then(|method| self.lookup(method, &path).map(|found| (method, found)));
            let Some((method, (endpoint, params))) = found else {
                return Response::status(StatusCode::NOT_FOUND);
            };

            let params = match params {
                Ok(params) => params,
                Err(condition) => return self.errors.map(condition),
            };
            let request = Request::new(method, parts.uri.clone(), parts.headers.clone(), body, params, self.state.clone());
            match self.invoke(endpoint, request).await {
                Ok(response) => response,
                Err(condition) => self.errors.map(condition),
            }
        })
        .await
    }

    /// Gate, bind, call. Panics inside the handler become unexpected conditions.
    async fn invoke(&self, endpoint: &Endpoint, mut request: Request) -> Result<Response, ApiError> {
        if endpoint.descriptor.auth {
            let gate = self.gate.as_ref().ok_or_else(|| {
                ApiError::unexpected(format!(
                    "route `{} {}` is gated but no authentication is configured",
                    endpoint.descriptor.method, endpoint.descriptor.path
                ))
            })?;
            let principal = gate.authenticate(request.headers())?;
            request.extensions_mut().insert(principal);
        }

        // `call` binds the arguments and invokes the handler before any future
        // exists, so it has to run inside the guarded future too.
        let called = async move { endpoint.handler.call(request).await };
        match AssertUnwindSafe(called).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_owned());
                Err(ApiError::unexpected(format!("handler panicked: {detail}")))
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn signature_of<T, H: Handler<T>>(_: &H) -> fn(&mut SchemaRegistry) -> Signature {
    H::signature
}

// ── Routes ────────────────────────────────────────────────────────────────────

/// Builder for documented routes. Nested groups inherit the path prefix,
/// the auth requirement and scoped failures of their parent.
pub struct Routes<'r> {
    router: &'r mut Router,
    prefix: String,
    auth: bool,
    failures: Vec<DocumentedFailure>,
}

impl Routes<'_> {
    /// A nested group under `path`.
    pub fn route(&mut self, path: &str, declare: impl FnOnce(&mut Routes<'_>)) -> &mut Self {
        let prefix = format!("{}{path}", self.prefix);
        self.nested(prefix, self.auth, None, declare)
    }

    /// A group whose routes document `kind` as a possible failure.
    ///
    /// Only the documentation changes; the error mapper handles `kind` the
    /// same way everywhere.
    pub fn throws(&mut self, kind: ConditionKind, description: &str, declare: impl FnOnce(&mut Routes<'_>)) -> &mut Self {
        let failure = DocumentedFailure { kind, description: description.to_owned() };
        self.nested(self.prefix.clone(), self.auth, Some(failure), declare)
    }

    /// A group behind the router's [`BasicAuth`] gate.
    pub fn authenticated(&mut self, declare: impl FnOnce(&mut Routes<'_>)) -> &mut Self {
        self.nested(self.prefix.clone(), true, None, declare)
    }

    pub fn get<T>(&mut self, path: &str, info: Info, handler: impl Handler<T>) -> &mut Self {
        self.endpoint(Method::Get, path, info, handler)
    }

    pub fn post<T>(&mut self, path: &str, info: Info, handler: impl Handler<T>) -> &mut Self {
        self.endpoint(Method::Post, path, info, handler)
    }

    pub fn put<T>(&mut self, path: &str, info: Info, handler: impl Handler<T>) -> &mut Self {
        self.endpoint(Method::Put, path, info, handler)
    }

    pub fn delete<T>(&mut self, path: &str, info: Info, handler: impl Handler<T>) -> &mut Self {
        self.endpoint(Method::Delete, path, info, handler)
    }

    fn endpoint<T>(&mut self, method: Method, path: &str, info: Info, handler: impl Handler<T>) -> &mut Self {
        let full = format!("{}{path}", self.prefix);
        let full = if full.is_empty() { "/".to_owned() } else { full };
        self.router.add(method, full, info, self.auth, true, self.failures.clone(), handler);
        self
    }

    fn nested(
        &mut self,
        prefix: String,
        auth: bool,
        failure: Option<DocumentedFailure>,
        declare: impl FnOnce(&mut Routes<'_>),
    ) -> &mut Self {
        let mut failures = self.failures.clone();
        failures.extend(failure);
        let mut group = Routes { router: &mut *self.router, prefix, auth, failures };
        declare(&mut group);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Path;
    use crate::middleware::auth::Principal;
    use crate::schema::{ApiSchema, Schema};

    #[derive(serde::Deserialize)]
    struct Name {
        name: String,
    }

    impl ApiSchema for Name {
        fn schema(_: &mut SchemaRegistry) -> Schema {
            Schema::object().required_property("name", Schema::string())
        }
    }

    async fn hello(Path(Name { name }): Path<Name>) -> String {
        format!("Hello, {name}!")
    }

    async fn whoami(principal: Principal) -> String {
        principal.name().to_owned()
    }

    async fn explode() -> String {
        panic!("kaboom")
    }

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::get(uri).body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn routes_bind_path_parameters() {
        let router = Router::new().api(|api| {
            api.route("/openapi", |r| {
                r.get("/{name}", Info::new("Hello world endpoint", "Greets."), hello);
            });
        });
        let response = router.handle(get("/openapi/Sigmund")).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.body(), b"Hello, Sigmund!");
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let router = Router::new().on(Method::Get, "/pure/{name}", hello);
        assert_eq!(router.handle(get("/nowhere")).await.status_code(), StatusCode::NOT_FOUND);

        let connect = http::Request::builder()
            .method(http::Method::CONNECT)
            .uri("/pure/x")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(router.handle(connect).await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn panics_become_generic_server_errors() {
        let router = Router::new().on(Method::Get, "/explode", explode);
        let response = router.handle(get("/explode")).await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!String::from_utf8_lossy(response.body()).contains("kaboom"));
    }

    #[tokio::test]
    async fn panics_before_the_future_exists_are_caught() {
        let router = Router::new().on(Method::Get, "/eager", || -> std::future::Ready<String> {
            panic!("failed while building the response future")
        });
        let response = router.handle(get("/eager")).await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn path_parameters_are_percent_decoded() {
        let router = Router::new().on(Method::Get, "/greet/{name}", hello);
        let response = router.handle(get("/greet/John%20Doe")).await;
        assert_eq!(response.body(), b"Hello, John Doe!");

        let response = router.handle(get("/greet/J%C3%BCrgen")).await;
        assert_eq!(response.body(), "Hello, Jürgen!".as_bytes());
    }

    #[tokio::test]
    async fn undecodable_path_parameters_are_malformed() {
        let router = Router::new().on(Method::Get, "/greet/{name}", hello);
        let response = router.handle(get("/greet/%FF%FE")).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(response.body()).contains("invalid path"));
    }

    #[tokio::test]
    async fn gated_routes_without_a_gate_fail_closed() {
        let router = Router::new().api(|api| {
            api.authenticated(|r| {
                r.get("/whoami", Info::default(), whoami);
            });
        });
        let response = router.handle(get("/whoami")).await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn groups_compose_prefix_auth_and_failures() {
        let router = Router::new().api(|api| {
            api.route("/cars", |cars| {
                cars.throws(ConditionKind::NotFound, "gone", |by_id| {
                    by_id.authenticated(|gated| {
                        gated.get("/{name}", Info::default(), hello);
                    });
                });
                cars.get("", Info::default(), hello);
            });
        });

        let descriptors: Vec<_> = router.descriptors().collect();
        assert_eq!(descriptors[0].path, "/cars/{name}");
        assert!(descriptors[0].auth);
        assert_eq!(descriptors[0].failures[0].kind, ConditionKind::NotFound);
        assert_eq!(descriptors[1].path, "/cars");
        assert!(!descriptors[1].auth);
        assert!(descriptors[1].failures.is_empty());
    }

    #[test]
    #[should_panic(expected = "outside an authenticated group")]
    fn principals_require_an_authenticated_group() {
        let _ = Router::new().on(Method::Get, "/whoami", whoami);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_are_rejected() {
        let _ = Router::new()
            .on(Method::Get, "/pure/{name}", hello)
            .on(Method::Get, "/pure/{name}", hello);
    }

    #[test]
    #[should_panic(expected = "before serve_docs")]
    fn documented_routes_after_docs_are_rejected() {
        let generator = OpenApiGenerator::new("t", "1");
        let _ = Router::new()
            .serve_docs(&generator)
            .api(|api| {
                api.get("/late", Info::default(), hello);
            });
    }
}

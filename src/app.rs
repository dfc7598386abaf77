//! The car registry application: handlers and the routers of each variant.

use crate::config::{Config, Variant};
use crate::error::{ApiError, ConditionKind};
use crate::extract::{Json, Path, Query, State};
use crate::method::Method;
use crate::middleware::auth::{BasicAuth, Principal, StaticCredentials};
use crate::middleware::errors::ErrorMapper;
use crate::model::{Car, CarFilter, CarId, NameParam, NewCar};
use crate::openapi::OpenApiGenerator;
use crate::request::Request;
use crate::router::{Info, Router, Routes};
use crate::store::CarRegistry;

/// Description of `404` wherever it is documented.
pub const CAR_NOT_FOUND: &str = "The requested car was not found.";

// ── Handlers ──────────────────────────────────────────────────────────────────

/// Undocumented greeting that reads the raw request.
pub async fn pure_hello(req: Request) -> String {
    format!("Hello, {}!", req.param("name").unwrap_or_default())
}

pub async fn hello(Path(NameParam { name }): Path<NameParam>) -> String {
    format!("Hello, {name}!")
}

pub async fn authenticated_hello(principal: Principal) -> String {
    format!("Hello, {}", principal.name())
}

pub async fn create_car(State(cars): State<CarRegistry>, Json(car): Json<NewCar>) -> Json<Car> {
    Json(cars.create(car))
}

pub async fn get_car(
    State(cars): State<CarRegistry>,
    Path(CarId { id }): Path<CarId>,
) -> Result<Json<Car>, ApiError> {
    cars.get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Car with id {id} not found.")))
}

pub async fn list_cars(
    State(cars): State<CarRegistry>,
    Query(CarFilter { color }): Query<CarFilter>,
) -> Json<Vec<Car>> {
    Json(cars.get_all(&color))
}

/// Full replacement: fields left out of the payload are cleared.
pub async fn update_car(
    State(cars): State<CarRegistry>,
    Path(CarId { id }): Path<CarId>,
    Json(car): Json<NewCar>,
) -> Result<Json<Car>, ApiError> {
    cars.replace(&id, car)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Car not found, cannot update."))
}

pub async fn delete_car(
    State(cars): State<CarRegistry>,
    Path(CarId { id }): Path<CarId>,
) -> Result<(), ApiError> {
    if cars.delete(&id) {
        Ok(())
    } else {
        Err(ApiError::not_found("Car not found, could not be deleted."))
    }
}

// ── Route declarations ────────────────────────────────────────────────────────

fn creation() -> Info {
    Info::new(
        "Car data creation",
        "This endpoints lets you insert a new car into the database. An ID will be generated for you.",
    )
}

fn retrieval_by_id() -> Info {
    Info::new("Car retrieval by id", "This endpoint responds with a representation of the car given the id.")
}

fn retrieval() -> Info {
    Info::new(
        "Car retrieval",
        "This endpoint responds with a representation of all the cars in the database, unless one or more \
         colors are specified, in which case only cars with the given colors are listed.",
    )
}

fn update() -> Info {
    Info::new(
        "Car data update",
        "This endpoints lets you update what is stored about a car. The entire car object is updated \
         according to input data, left out fields will be deleted.",
    )
}

fn deletion() -> Info {
    Info::new("Car deletion", "This endpoint deletes the car with the given id.")
}

fn create_route(cars: &mut Routes<'_>) {
    cars.post("", creation(), create_car);
}

fn list_route(cars: &mut Routes<'_>) {
    cars.get("", retrieval(), list_cars);
}

fn id_routes(cars: &mut Routes<'_>) {
    cars.get("/{id}", retrieval_by_id(), get_car)
        .put("/{id}", update(), update_car)
        .delete("/{id}", deletion(), delete_car);
}

fn write_routes(cars: &mut Routes<'_>) {
    cars.put("/{id}", update(), update_car)
        .delete("/{id}", deletion(), delete_car);
}

/// Title, version and server shared by every variant's document.
pub fn docs() -> OpenApiGenerator {
    OpenApiGenerator::new("Carlot", "1")
        .description("An in-memory car registry with generated API documentation.")
        .server("/", "This server")
}

// ── Variants ──────────────────────────────────────────────────────────────────

/// Greetings, with and without documentation.
pub fn hello_world() -> Router {
    Router::new()
        .on(Method::Get, "/pure/{name}", pure_hello)
        .api(|api| {
            api.route("/openapi", |greeting| {
                greeting.get(
                    "/{name}",
                    Info::new(
                        "Hello world endpoint",
                        "This endpoint responds with a friendly greeting using the provided name.",
                    ),
                    hello,
                );
            });
        })
        .serve_docs(&docs())
}

/// CRUD on `/cars`; no failure is documented.
pub fn crud(cars: CarRegistry) -> Router {
    Router::new()
        .state(cars)
        .api(|api| {
            api.route("/cars", |cars| {
                create_route(cars);
                cars.get("/{id}", retrieval_by_id(), get_car);
                list_route(cars);
                write_routes(cars);
            });
        })
        .serve_docs(&docs())
}

/// CRUD with `404` documented on every route.
pub fn crud_with_status_pages(cars: CarRegistry) -> Router {
    Router::new()
        .state(cars)
        .errors(ErrorMapper::new().document(ConditionKind::NotFound, CAR_NOT_FOUND))
        .api(|api| {
            api.route("/cars", |cars| {
                create_route(cars);
                cars.get("/{id}", retrieval_by_id(), get_car);
                list_route(cars);
                write_routes(cars);
            });
        })
        .serve_docs(&docs())
}

/// CRUD with `404` documented only where a lookup by id happens.
pub fn crud_with_scoped_errors(cars: CarRegistry) -> Router {
    Router::new()
        .state(cars)
        .api(|api| {
            api.route("/cars", |cars| {
                create_route(cars);
                list_route(cars);
                cars.throws(ConditionKind::NotFound, CAR_NOT_FOUND, id_routes);
            });
        })
        .serve_docs(&docs())
}

/// Public reads; creation, update, deletion and `/hello` behind basic auth.
pub fn crud_with_authentication(cars: CarRegistry, gate: BasicAuth) -> Router {
    Router::new()
        .state(cars)
        .authentication(gate)
        .api(|api| {
            api.route("/cars", |cars| {
                list_route(cars);
                cars.get("/{id}", retrieval_by_id(), get_car);
                cars.authenticated(|gated| {
                    create_route(gated);
                    write_routes(gated);
                });
            });
            api.authenticated(|gated| {
                gated.get("/hello", Info::new("Authenticated greeting", "Greets the authenticated user."), authenticated_hello);
            });
        })
        .serve_docs(&docs())
}

/// The router `config` selects.
pub fn build(config: &Config, cars: CarRegistry) -> Router {
    match config.variant {
        Variant::HelloWorld    => hello_world(),
        Variant::Crud          => crud(cars),
        Variant::StatusPages   => crud_with_status_pages(cars),
        Variant::ScopedErrors  => crud_with_scoped_errors(cars),
        Variant::Authenticated => {
            let gate = BasicAuth::new(
                config.realm.clone(),
                StaticCredentials::new(config.username.clone(), config.password.clone()),
            );
            crud_with_authentication(cars, gate)
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use clap::Parser;
    use http::StatusCode;

    use super::*;

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::get(uri).body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn pure_and_documented_greetings_agree() {
        let app = hello_world();
        let pure = app.handle(get("/pure/Sigmund")).await;
        let documented = app.handle(get("/openapi/Sigmund")).await;
        assert_eq!(pure.body(), b"Hello, Sigmund!");
        assert_eq!(documented.body(), pure.body());
    }

    #[test]
    fn every_variant_builds() {
        for variant in ["hello-world", "crud", "status-pages", "scoped-errors", "authenticated"] {
            let config = Config::try_parse_from(["carlot", "--variant", variant]).unwrap();
            let app = build(&config, CarRegistry::new());
            assert!(app.descriptors().any(|d| d.documented), "{variant} documents nothing");
        }
    }

    #[tokio::test]
    async fn root_redirects_to_the_ui() {
        let response = crud(CarRegistry::new()).handle(get("/")).await;
        assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), Some("/swagger-ui/index.html?url=/openapi.json"));
    }

    #[tokio::test]
    async fn missing_cars_use_the_domain_messages() {
        let app = crud(CarRegistry::new());
        let response = app.handle(get("/cars/nope")).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), br#"{"msg":"Car with id nope not found."}"#);

        let delete = http::Request::delete("/cars/nope").body(Bytes::new()).unwrap();
        let response = app.handle(delete).await;
        assert_eq!(response.body(), br#"{"msg":"Car not found, could not be deleted."}"#);
    }
}

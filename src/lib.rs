//! # carlot
//!
//! An in-memory car registry served over HTTP, with generated OpenAPI
//! documentation, typed request binding, one place that maps conditions to
//! status codes, and a basic-auth gate for part of the routes.
//!
//! ## Per request
//!
//! ```text
//! hyper ─▶ Router::handle ─▶ trace span
//!                             └─▶ route lookup (matchit, 404 if none)
//!                                 └─▶ auth gate (gated routes only)
//!                                     └─▶ binding: Path / Query / Json / State / Principal
//!                                         └─▶ handler ─▶ Ok(response) | Err(ApiError)
//!                                                           └─▶ ErrorMapper ─▶ status + body
//! ```
//!
//! Handlers are plain async functions over typed inputs. They never build
//! error responses; they return an [`ApiError`] and the [`ErrorMapper`]
//! decides the status.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use carlot::store::CarRegistry;
//! use carlot::{Info, Json, Router, Server, State};
//! use carlot::model::Car;
//!
//! async fn list(State(cars): State<CarRegistry>) -> Json<Vec<Car>> {
//!     Json(cars.get_all(&[]))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), carlot::Error> {
//!     let app = Router::new()
//!         .state(CarRegistry::new())
//!         .api(|api| {
//!             api.get("/cars", Info::new("Car retrieval", "Every car."), list);
//!         })
//!         .serve_docs(&carlot::app::docs());
//!
//!     Server::bind("0.0.0.0:9002".parse().unwrap()).serve(app).await
//! }
//! ```

mod error;
mod extract;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod config;
pub mod middleware;
pub mod model;
pub mod openapi;
pub mod schema;
pub mod store;

pub use error::{ApiError, ConditionKind, Error, InputSource};
pub use extract::{FromRequest, Json, Path, Query, State};
pub use handler::{Handler, HandlerOutput};
pub use method::Method;
pub use middleware::auth::{BasicAuth, CredentialStore, Principal, StaticCredentials};
pub use middleware::errors::{ErrorMapper, Problem};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::{DocumentedFailure, Info, RouteDescriptor, Router, Routes};
pub use server::Server;

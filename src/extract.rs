//! Request binding.
//!
//! Handlers declare their inputs as arguments; each argument type implements
//! [`FromRequest`]. All arguments are bound before the handler body runs, and
//! the first failure ends the request — a handler is never called with
//! partial input.
//!
//! ```rust,ignore
//! async fn update_car(
//!     State(cars): State<CarRegistry>,
//!     Path(CarId { id }): Path<CarId>,
//!     Json(car): Json<NewCar>,
//! ) -> Result<Json<Car>, ApiError> { … }
//! ```
//!
//! Each extractor also describes itself for the generated documentation
//! ([`FromRequest::describe`]), so the document is derived from the same
//! types that do the binding.

use std::any::type_name;
use std::ops::Deref;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::{ApiError, InputSource};
use crate::handler::HandlerOutput;
use crate::openapi::{Content, Parameter, ParameterIn, Signature};
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::schema::{ApiSchema, Schema, SchemaRegistry, SchemaType};

/// Binds one handler argument from the request.
pub trait FromRequest: Sized + Send + 'static {
    fn from_request(req: &Request) -> Result<Self, ApiError>;

    /// Adds what this argument contributes to the handler's documented signature.
    fn describe(_signature: &mut Signature, _registry: &mut SchemaRegistry) {}
}

/// The raw request, for handlers that do their own parsing.
impl FromRequest for Request {
    fn from_request(req: &Request) -> Result<Self, ApiError> {
        Ok(req.clone())
    }
}

// ── Path ──────────────────────────────────────────────────────────────────────

/// Named path parameters, deserialized into `T`.
///
/// Every property of `T`'s schema is documented as a required path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<T>(pub T);

impl<T> Deref for Path<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T: DeserializeOwned + ApiSchema + Send + 'static> FromRequest for Path<T> {
    fn from_request(req: &Request) -> Result<Self, ApiError> {
        let params: Map<String, Value> = req
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        serde_json::from_value(Value::Object(params))
            .map(Path)
            .map_err(|e| ApiError::malformed(InputSource::Path, e.to_string()))
    }

    fn describe(signature: &mut Signature, registry: &mut SchemaRegistry) {
        let shape = T::schema(registry);
        let shape = registry.resolve(shape);
        for (name, schema) in shape.properties {
            signature.parameters.push(Parameter::new(name, ParameterIn::Path, true, schema));
        }
    }
}

// ── Query ─────────────────────────────────────────────────────────────────────

/// Query-string parameters, deserialized into `T`.
///
/// Decoding follows `T`'s declared schema: a key may repeat when its
/// property is an array (`?color=RED&color=BLUE`); for scalar properties the
/// last value wins. Integer, number and boolean properties are parsed from
/// text. Keys `T` does not declare are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T> Deref for Query<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T: DeserializeOwned + ApiSchema + Send + 'static> FromRequest for Query<T> {
    fn from_request(req: &Request) -> Result<Self, ApiError> {
        let malformed = |message: String| ApiError::malformed(InputSource::Query, message);

        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(req.query().unwrap_or(""))
            .map_err(|e| malformed(e.to_string()))?;

        // Query shapes are small; resolving per request keeps binding and docs on one source.
        let mut registry = SchemaRegistry::new();
        let shape = T::schema(&mut registry);
        let shape = registry.resolve(shape);

        let mut object = Map::new();
        for (name, property) in &shape.properties {
            let values: Vec<&str> = pairs
                .iter()
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .collect();

            if property.is_array() {
                let items = property.items.as_deref().cloned().unwrap_or_default();
                let items = registry.resolve(items);
                let decoded = values
                    .iter()
                    .map(|v| coerce(name, v, &items))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(malformed)?;
                object.insert(name.clone(), Value::Array(decoded));
            } else if let Some(last) = values.last() {
                let property = registry.resolve(property.clone());
                object.insert(name.clone(), coerce(name, last, &property).map_err(malformed)?);
            }
        }

        serde_json::from_value(Value::Object(object))
            .map(Query)
            .map_err(|e| malformed(e.to_string()))
    }

    fn describe(signature: &mut Signature, registry: &mut SchemaRegistry) {
        let shape = T::schema(registry);
        let shape = registry.resolve(shape);
        for (name, schema) in shape.properties {
            let required = shape.required.contains(&name);
            signature.parameters.push(Parameter::new(name, ParameterIn::Query, required, schema));
        }
    }
}

/// Turns one query value into the JSON value its schema expects.
fn coerce(name: &str, raw: &str, schema: &Schema) -> Result<Value, String> {
    let invalid = |what: &str| format!("parameter `{name}`: `{raw}` is not {what}");
    match schema.schema_type {
        Some(SchemaType::Integer) => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("an integer")),
        Some(SchemaType::Number) => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("a number")),
        Some(SchemaType::Boolean) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid("a boolean")),
        _ => Ok(Value::String(raw.to_owned())),
    }
}

// ── Json ──────────────────────────────────────────────────────────────────────

/// A JSON body: request input when used as an argument, response output when
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Deref for Json<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T: DeserializeOwned + ApiSchema + Send + 'static> FromRequest for Json<T> {
    fn from_request(req: &Request) -> Result<Self, ApiError> {
        if req.body().is_empty() {
            return Err(ApiError::malformed(InputSource::Body, "request body is empty"));
        }
        serde_json::from_slice(req.body())
            .map(Json)
            .map_err(|e| ApiError::malformed(InputSource::Body, e.to_string()))
    }

    fn describe(signature: &mut Signature, registry: &mut SchemaRegistry) {
        signature.request_body = Some(Content::new(ContentType::Json, T::schema(registry)));
    }
}

impl<T: Serialize + ApiSchema + Send + 'static> HandlerOutput for Json<T> {
    fn into_outcome(self) -> Result<Response, ApiError> {
        let bytes = serde_json::to_vec(&self.0)
            .map_err(|e| ApiError::unexpected(format!("serializing {}: {e}", type_name::<T>())))?;
        Ok(Response::json(bytes))
    }

    fn describe(registry: &mut SchemaRegistry) -> Option<Content> {
        Some(Content::new(ContentType::Json, T::schema(registry)))
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Application state injected with [`Router::state`](crate::Router::state).
#[derive(Debug, Clone)]
pub struct State<T>(pub T);

impl<T> Deref for State<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T: Clone + Send + Sync + 'static> FromRequest for State<T> {
    fn from_request(req: &Request) -> Result<Self, ApiError> {
        req.extensions()
            .get::<T>()
            .cloned()
            .map(State)
            .ok_or_else(|| ApiError::unexpected(format!("no state of type {} registered", type_name::<T>())))
    }
}

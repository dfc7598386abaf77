//! Handler trait and type erasure.
//!
//! # How typed handlers are stored
//!
//! The router holds handlers of *different* types in one table, so each one
//! is erased behind `dyn ErasedHandler`. A handler is any async function
//! whose arguments implement [`FromRequest`] and whose output implements
//! [`HandlerOutput`]:
//!
//! ```text
//! async fn get_car(State<CarRegistry>, Path<CarId>) -> Result<Json<Car>, ApiError>
//!        ↓ routes.get("/{id}", info, get_car)
//! get_car.into_boxed_handler()            ← Handler<(State<_>, Path<_>)> blanket impl
//!        ↓
//! Arc::new(FnHandler { f: get_car, .. }) ← stored as BoxedHandler
//!        ↓
//! handler.call(req) at request time       ← bind every argument, then call
//!        ↓
//! Result<Response, ApiError>              ← handed to the error mapper
//! ```
//!
//! [`Handler::signature`] walks the same argument and output types to build
//! the handler's documented shape, so the docs come from the types that do
//! the work.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ApiError;
use crate::extract::FromRequest;
use crate::openapi::{Content, Signature};
use crate::request::Request;
use crate::response::{ContentType, IntoResponse, Response};
use crate::schema::{ApiSchema, SchemaRegistry};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased handler future.
///
/// `Pin<Box<…>>` because the runtime polls it in place; `Send + 'static`
/// lets tokio move it across worker threads.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── HandlerOutput ─────────────────────────────────────────────────────────────

/// What a handler may return: a success value, or a success value or a
/// condition.
///
/// `describe` documents the `200` response; conditions are documented by the
/// error mapper and route groups, not here.
pub trait HandlerOutput: Send + 'static {
    fn into_outcome(self) -> Result<Response, ApiError>;

    fn describe(_registry: &mut SchemaRegistry) -> Option<Content> {
        None
    }
}

impl<T: HandlerOutput> HandlerOutput for Result<T, ApiError> {
    fn into_outcome(self) -> Result<Response, ApiError> {
        self.and_then(|value| value.into_outcome())
    }

    fn describe(registry: &mut SchemaRegistry) -> Option<Content> {
        T::describe(registry)
    }
}

impl HandlerOutput for Response {
    fn into_outcome(self) -> Result<Response, ApiError> { Ok(self) }
}

impl HandlerOutput for () {
    fn into_outcome(self) -> Result<Response, ApiError> { Ok(self.into_response()) }
}

impl HandlerOutput for String {
    fn into_outcome(self) -> Result<Response, ApiError> { Ok(self.into_response()) }

    fn describe(registry: &mut SchemaRegistry) -> Option<Content> {
        Some(Content::new(ContentType::Text, String::schema(registry)))
    }
}

impl HandlerOutput for &'static str {
    fn into_outcome(self) -> Result<Response, ApiError> { Ok(self.into_response()) }

    fn describe(registry: &mut SchemaRegistry) -> Option<Content> {
        Some(Content::new(ContentType::Text, String::schema(registry)))
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) taking up to four [`FromRequest`] arguments
/// and returning a [`HandlerOutput`]. `T` is the tuple of argument types and
/// only exists to keep the blanket impls apart.
///
/// The trait is **sealed** (via the private `Sealed` supertrait).
pub trait Handler<T>: private::Sealed<T> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;

    /// The documented shape of this handler: parameters, body, response.
    #[doc(hidden)]
    fn signature(registry: &mut SchemaRegistry) -> Signature;
}

mod private {
    pub trait Sealed<T> {}
}

/// Holds a concrete handler `F` and implements [`ErasedHandler`], bridging
/// the typed world to the trait-object world.
struct FnHandler<F, T> {
    f: F,
    _args: PhantomData<fn() -> T>,
}

// ── Blanket implementations ───────────────────────────────────────────────────

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, Fut, R, $($arg,)*> private::Sealed<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: HandlerOutput,
            $($arg: FromRequest,)*
        {
        }

        impl<F, Fut, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: HandlerOutput,
            $($arg: FromRequest,)*
        {
            fn into_boxed_handler(self) -> BoxedHandler {
                Arc::new(FnHandler { f: self, _args: PhantomData::<fn() -> ($($arg,)*)> })
            }

            fn signature(registry: &mut SchemaRegistry) -> Signature {
                #[allow(unused_mut)]
                let mut signature = Signature::default();
                $( <$arg as FromRequest>::describe(&mut signature, registry); )*
                signature.response = R::describe(registry);
                signature
            }
        }

        impl<F, Fut, R, $($arg,)*> ErasedHandler for FnHandler<F, ($($arg,)*)>
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: HandlerOutput,
            $($arg: FromRequest,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, req: Request) -> BoxFuture {
                // Bind every argument before the handler runs.
                $(
                    let $arg = match <$arg as FromRequest>::from_request(&req) {
                        Ok(value) => value,
                        Err(e) => return Box::pin(async move { Err(e) }),
                    };
                )*
                let fut = (self.f)($($arg),*);
                Box::pin(async move { fut.await.into_outcome() })
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);

//! HTTP Basic authentication gate.
//!
//! Gated routes run this before binding or calling the handler. Per request
//! the gate moves through:
//!
//! ```text
//! Unauthenticated ──credentials──▶ Challenged ──validate──▶ Authenticated(principal)
//!                                                     └───▶ Rejected
//! ```
//!
//! Anything but `Authenticated` ends the request with
//! [`ApiError::Unauthenticated`]; otherwise the [`Principal`] is attached to
//! the request for the gated handler to extract.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use http::header::AUTHORIZATION;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::extract::FromRequest;
use crate::openapi::Signature;
use crate::request::Request;
use crate::schema::SchemaRegistry;

/// The authenticated caller. Lives for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Only extractable on routes declared inside
/// [`Routes::authenticated`](crate::Routes::authenticated); the router
/// refuses to register it anywhere else.
impl FromRequest for Principal {
    fn from_request(req: &Request) -> Result<Self, ApiError> {
        req.extensions()
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| ApiError::unexpected("principal requested on a route without authentication"))
    }

    fn describe(signature: &mut Signature, _registry: &mut SchemaRegistry) {
        signature.requires_principal = true;
    }
}

/// Name/password validation.
pub trait CredentialStore: Send + Sync + 'static {
    fn validate(&self, name: &str, password: &str) -> Option<Principal>;
}

/// A single fixed name/password pair.
///
/// Plain comparison, for demonstration. A real deployment plugs in a store
/// with constant-time comparison and externally managed secrets.
#[derive(Clone)]
pub struct StaticCredentials {
    name: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self { name: name.into(), password: password.into() }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CredentialStore for StaticCredentials {
    fn validate(&self, name: &str, password: &str) -> Option<Principal> {
        (name == self.name && password == self.password).then(|| Principal::new(name))
    }
}

/// Where a gated request stands.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Challenged { name: String, password: String },
    Authenticated(Principal),
    Rejected,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("Unauthenticated"),
            Self::Challenged { name, .. } => f.debug_struct("Challenged").field("name", name).finish_non_exhaustive(),
            Self::Authenticated(p) => f.debug_tuple("Authenticated").field(p).finish(),
            Self::Rejected => f.write_str("Rejected"),
        }
    }
}

impl AuthState {
    /// `Challenged` if the request carries well-formed Basic credentials.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match basic_credentials(headers) {
            Some((name, password)) => Self::Challenged { name, password },
            None => Self::Unauthenticated,
        }
    }

    /// Settles a `Challenged` state against `store`. Other states are final.
    pub fn validate(self, store: &dyn CredentialStore) -> Self {
        match self {
            Self::Challenged { name, password } => match store.validate(&name, &password) {
                Some(principal) => Self::Authenticated(principal),
                None => Self::Rejected,
            },
            settled => settled,
        }
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (name, password) = decoded.split_once(':')?;
    Some((name.to_owned(), password.to_owned()))
}

/// The gate wrapped around authenticated route groups.
#[derive(Clone)]
pub struct BasicAuth {
    realm: String,
    store: Arc<dyn CredentialStore>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth").field("realm", &self.realm).finish_non_exhaustive()
    }
}

impl BasicAuth {
    pub fn new(realm: impl Into<String>, store: impl CredentialStore) -> Self {
        Self { realm: realm.into(), store: Arc::new(store) }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        match AuthState::from_headers(headers).validate(self.store.as_ref()) {
            AuthState::Authenticated(principal) => {
                debug!(user = principal.name(), "authenticated");
                Ok(principal)
            }
            AuthState::Rejected => {
                warn!(realm = %self.realm, "rejected credentials");
                Err(self.challenge())
            }
            state => {
                debug!(?state, "no credentials supplied");
                Err(self.challenge())
            }
        }
    }

    fn challenge(&self) -> ApiError {
        ApiError::Unauthenticated { realm: self.realm.clone() }
    }
}

//! Error mapping.
//!
//! An ordered list of condition → status rules, applied around every handler
//! invocation, including binding and authentication failures. The first rule
//! whose kind matches wins; a condition no rule claims falls through to a
//! generic `500` whose detail only ever reaches the logs.
//!
//! Behaviour is per-process. Documentation is not: a rule can be documented
//! for every route ([`ErrorMapper::document`]), for a group of routes
//! ([`Routes::throws`](crate::Routes::throws)), or not at all. The `500`
//! fallback is never documented — the document lists expected failure modes,
//! not accidents.

use http::StatusCode;
use http::header::WWW_AUTHENTICATE;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{ApiError, ConditionKind};
use crate::response::{ContentType, Response};
use crate::schema::{ApiSchema, Schema, SchemaRegistry};

/// Body of the `500` fallback.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal problem has occurred. Contact the system administrator and have them check the logs.";

/// JSON body of mapped, documentable failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub msg: String,
}

impl ApiSchema for Problem {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        registry.named::<Self>(|_| {
            Schema::object()
                .with_description("Why the request could not be served")
                .required_property("msg", Schema::string())
        })
    }
}

#[derive(Clone, Debug)]
struct Rule {
    kind: ConditionKind,
    status: StatusCode,
    documented: Option<String>,
}

impl Rule {
    fn new(kind: ConditionKind, status: StatusCode) -> Self {
        Self { kind, status, documented: None }
    }
}

/// A rule that appears in the documentation of every route.
#[derive(Clone, Copy, Debug)]
pub struct DocumentedRule<'a> {
    pub kind: ConditionKind,
    pub status: StatusCode,
    pub description: &'a str,
}

/// Condition → response translation.
#[derive(Clone, Debug)]
pub struct ErrorMapper {
    rules: Vec<Rule>,
}

impl Default for ErrorMapper {
    fn default() -> Self { Self::new() }
}

impl ErrorMapper {
    /// Malformed input → `400`, not found → `404`, unauthenticated → `401`.
    /// Nothing documented.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Rule::new(ConditionKind::MalformedInput, StatusCode::BAD_REQUEST),
                Rule::new(ConditionKind::NotFound, StatusCode::NOT_FOUND),
                Rule::new(ConditionKind::Unauthenticated, StatusCode::UNAUTHORIZED),
            ],
        }
    }

    /// Documents `kind` on every route.
    ///
    /// # Panics
    ///
    /// Panics for [`ConditionKind::Unexpected`]: the fallback has no rule and
    /// stays undocumented.
    pub fn document(mut self, kind: ConditionKind, description: &str) -> Self {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.kind == kind)
            .unwrap_or_else(|| panic!("no error mapping for {kind:?} to document"));
        rule.documented = Some(description.to_owned());
        self
    }

    /// The status a mapping rule assigns to `kind`, or `None` if `kind` falls
    /// through to the undocumented fallback.
    pub fn status_of(&self, kind: ConditionKind) -> Option<StatusCode> {
        self.rules.iter().find(|r| r.kind == kind).map(|r| r.status)
    }

    /// Rules documented on every route, in rule order.
    pub fn documented(&self) -> impl Iterator<Item = DocumentedRule<'_>> {
        self.rules.iter().filter_map(|r| {
            r.documented.as_deref().map(|description| DocumentedRule {
                kind: r.kind,
                status: r.status,
                description,
            })
        })
    }

    /// Renders `condition` as the response the caller sees.
    pub fn map(&self, condition: ApiError) -> Response {
        let Some(status) = self.status_of(condition.kind()) else {
            return internal(&condition);
        };

        match condition {
            ApiError::MalformedInput { .. } | ApiError::NotFound(_) => {
                let problem = Problem { msg: problem_message(&condition) };
                match serde_json::to_vec(&problem) {
                    Ok(body) => Response::builder().status(status).bytes(ContentType::Json, body),
                    Err(e) => internal(&ApiError::unexpected(e)),
                }
            }
            ApiError::Unauthenticated { realm } => Response::builder()
                .status(status)
                .header(WWW_AUTHENTICATE, &format!("Basic realm=\"{realm}\", charset=\"UTF-8\""))
                .no_body(),
            ApiError::Unexpected(_) => internal(&condition),
        }
    }
}

fn problem_message(condition: &ApiError) -> String {
    match condition {
        ApiError::NotFound(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn internal(condition: &ApiError) -> Response {
    error!("unexpected condition: {condition:#}");
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text(INTERNAL_ERROR_MESSAGE)
}

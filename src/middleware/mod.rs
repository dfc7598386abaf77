//! Middleware layer.
//!
//! The cross-cutting concerns that wrap every handler invocation, in the
//! order a request meets them:
//!
//! ```text
//! trace ─▶ auth (gated routes only) ─▶ binding ─▶ handler ─▶ errors
//! ```
//!
//! - [`trace`] — per-request span with method and path; logs status and latency.
//! - [`auth`] — HTTP Basic gate producing a [`Principal`](auth::Principal).
//! - [`errors`] — the single place conditions become status codes and bodies.
//!
//! Handlers stay free of all three: they bind typed input and return a value
//! or an [`ApiError`](crate::ApiError).

pub mod auth;
pub mod errors;
pub(crate) mod trace;

//! Per-request tracing span.

use std::future::Future;
use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::response::Response;

/// Runs `exchange` inside a `request` span and logs how it ended.
pub(crate) async fn traced<F>(method: &http::Method, path: &str, exchange: F) -> Response
where
    F: Future<Output = Response>,
{
    let span = info_span!("request", %method, path);
    async move {
        let started = Instant::now();
        let response = exchange.await;
        info!(status = response.status_code().as_u16(), elapsed = ?started.elapsed(), "request finished");
        response
    }
    .instrument(span)
    .await
}

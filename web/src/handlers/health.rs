//! Liveness and metrics endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, http::header, response::IntoResponse};

/// Liveness probe. Does not touch the record store.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus exposition of the installed recorder.
///
/// ```text
/// GET /metrics
/// ```
///
/// # Errors
///
/// 404 when the server runs without a metrics exporter.
#[allow(clippy::unused_async)]
pub async fn metrics_endpoint<S>(
    State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::not_found("Metrics are disabled."))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}

//! Router configuration.

use crate::handlers::{
    check_user, get_capacity, health_check, list_all, metrics_endpoint, modify_membership, reserve,
};
use crate::middleware::request_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use spotbook_core::RecordStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Routes:
/// - `GET /reservations`, `POST /reserve`, `GET /reservations/all`
/// - `PUT /modify-membership`, `GET /check-user`
/// - `GET /health`, `GET /metrics`
///
/// Every route answers any origin (permissive CORS), is traced, and
/// carries an `X-Request-ID`.
pub fn build_router<S: RecordStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/reservations", get(get_capacity::<S>))
        .route("/reservations/all", get(list_all::<S>))
        .route("/reserve", post(reserve::<S>))
        .route("/modify-membership", put(modify_membership::<S>))
        .route("/check-user", get(check_user::<S>))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(request_id_layer())
        .with_state(state)
}

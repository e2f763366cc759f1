use axum::{extract::FromRef, routing::get, Router};

use api_state::ApiState;
use routes::{liveness::healthz, readiness::ready, root::service_info};

pub mod api_state;
mod routes;

/// Probe and service-info routes. Everything else the service does lives
/// behind other processes; this surface exists for orchestrators and smoke
/// checks.
pub fn api_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/", get(service_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(ready))
}

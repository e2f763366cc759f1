use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use common::{
    storage::db::{self, PostgresClient},
    utils::config::{get_config, AppConfig},
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Worker count of the production runtime, the fixed-size pool a
/// multi-worker deployment would run.
const PRODUCTION_WORKER_THREADS: usize = 4;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Get config first: the log level default depends on the run mode
    let config = get_config()?;

    // Set up tracing
    let default_filter = if config.is_development() {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .try_init()
        .ok();

    // Development runs single-threaded (the dev-server shape); production
    // gets a fixed pool of workers.
    let runtime = if config.is_development() {
        info!("starting in development mode");
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    } else {
        info!(
            workers = PRODUCTION_WORKER_THREADS,
            "starting in production mode"
        );
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(PRODUCTION_WORKER_THREADS)
            .enable_all()
            .build()?
    };

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Soft wait: an unreachable datastore is logged, never fatal
    let _ = db::wait_for_datastore(&config).await;

    let database = Arc::new(PostgresClient::connect_lazy(&config));

    // Optional initialization hook; Skipped and Failed both continue
    let _outcome = db::run_initializer(database.as_ref()).await;

    let state = ApiState::new(database, config.clone());
    let app = Router::new().merge(api_routes()).with_state(state);

    info!("Starting server listening on {}", config.bind_address());
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn smoke_test_config() -> AppConfig {
        AppConfig {
            // Nothing listens here; readiness must degrade, not hang
            db_host: "127.0.0.1".into(),
            db_port: 54399,
            db_user: "postgres".into(),
            db_password: String::new(),
            db_name: "postgres".into(),
            run_env: "development".into(),
            http_host: "127.0.0.1".into(),
            http_port: 0,
        }
    }

    fn smoke_test_app() -> Router {
        let config = smoke_test_config();
        let database = Arc::new(PostgresClient::connect_lazy(&config));
        let state = ApiState::new(database, config);
        Router::new().merge(api_routes()).with_state(state)
    }

    #[tokio::test]
    async fn liveness_answers_without_a_database() {
        let response = smoke_test_app()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn service_info_reports_the_service_name() {
        let response = smoke_test_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["service"], "Service Chatbot Backend");
    }

    #[tokio::test]
    async fn readiness_degrades_to_unavailable_without_a_database() {
        let response = smoke_test_app()
            .oneshot(
                Request::builder()
                    .uri("/readyz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn initializer_failure_does_not_abort_startup_sequence() {
        // connect_lazy against a dead address: the initializer runs, fails,
        // and the sequencer keeps going
        let config = smoke_test_config();
        let database = PostgresClient::connect_lazy(&config);
        match db::run_initializer(&database).await {
            db::InitOutcome::Failed(_) => {}
            other => panic!("expected Failed against a dead database, got {other:?}"),
        }
    }
}

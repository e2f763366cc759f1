use std::{future::Future, ops::Deref, sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tokio::net::TcpStream;
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{debug, error, info, warn};

use crate::{error::AppError, storage::schema, utils::config::AppConfig};

/// Retry budget for the startup readiness wait: 60 attempts, 1s apart.
pub const READY_MAX_ATTEMPTS: usize = 60;
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

const POOL_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct PostgresClient {
    pub pool: PgPool,
}

pub trait ProvidesDb {
    fn db(&self) -> &Arc<PostgresClient>;
}

impl PostgresClient {
    /// Build the connection pool without touching the network. Connections
    /// are established on first use, so an unreachable database surfaces at
    /// query time instead of failing startup.
    pub fn connect_lazy(config: &AppConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .password(&config.db_password)
            .database(&config.db_name);

        let pool = PgPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect_lazy_with(options);

        PostgresClient { pool }
    }

    /// Wrap an already-connected pool (tests, integration harnesses).
    pub fn from_pool(pool: PgPool) -> Self {
        PostgresClient { pool }
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl Deref for PostgresClient {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Ready,
    NotReady,
}

/// Poll `probe` up to `max_attempts` times spaced by `interval`, stopping on
/// the first success. Exhausting the budget is not an error; the caller
/// proceeds either way and the datastore gets to fail later, loudly.
pub async fn wait_until_ready<F, Fut, E>(
    max_attempts: usize,
    interval: Duration,
    mut probe: F,
) -> ReadyState
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut attempt: usize = 0;
    let strategy = FixedInterval::new(interval).take(max_attempts.saturating_sub(1));

    let result = Retry::spawn(strategy, || {
        attempt += 1;
        let this_attempt = attempt;
        info!(
            attempt = this_attempt,
            max_attempts, "waiting for datastore to accept connections"
        );
        let fut = probe();
        async move {
            fut.await.map_err(|e| {
                debug!(attempt = this_attempt, error = %e, "datastore not ready yet");
                e
            })
        }
    })
    .await;

    match result {
        Ok(()) => {
            info!(attempts = attempt, "datastore is ready");
            ReadyState::Ready
        }
        Err(e) => {
            warn!(
                attempts = attempt,
                error = %e,
                "datastore never became ready, continuing startup anyway"
            );
            ReadyState::NotReady
        }
    }
}

/// TCP-level readiness probe against the configured datastore address.
pub async fn wait_for_datastore(config: &AppConfig) -> ReadyState {
    let address = format!("{}:{}", config.db_host, config.db_port);
    wait_until_ready(READY_MAX_ATTEMPTS, READY_POLL_INTERVAL, || {
        let address = address.clone();
        async move { TcpStream::connect(&address).await.map(|_| ()) }
    })
    .await
}

#[async_trait]
pub trait SchemaInitializer: Send + Sync {
    async fn apply(&self) -> Result<(), AppError>;
}

/// Storage collaborators may or may not ship an initializer; the sequencer
/// checks the capability instead of probing for entry points.
pub trait ProvidesInitializer {
    fn initializer(&self) -> Option<&dyn SchemaInitializer>;
}

#[async_trait]
impl SchemaInitializer for PostgresClient {
    async fn apply(&self) -> Result<(), AppError> {
        schema::apply(&self.pool).await
    }
}

impl ProvidesInitializer for PostgresClient {
    fn initializer(&self) -> Option<&dyn SchemaInitializer> {
        Some(self)
    }
}

/// Outcome of the optional initialization hook. `Skipped` (no initializer
/// provided) and `Failed` (ran and errored) are distinct, and neither aborts
/// startup.
#[derive(Debug)]
pub enum InitOutcome {
    Applied,
    Skipped,
    Failed(AppError),
}

pub async fn run_initializer<S>(store: &S) -> InitOutcome
where
    S: ProvidesInitializer + ?Sized,
{
    match store.initializer() {
        None => {
            info!("storage layer provides no schema initializer, skipping");
            InitOutcome::Skipped
        }
        Some(init) => match init.apply().await {
            Ok(()) => {
                info!("schema initialization complete");
                InitOutcome::Applied
            }
            Err(e) => {
                error!(error = %e, "schema initialization failed, continuing startup");
                InitOutcome::Failed(e)
            }
        },
    }
}

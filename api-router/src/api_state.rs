use std::sync::Arc;

use common::{storage::db::PostgresClient, utils::config::AppConfig};

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<PostgresClient>,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(db: Arc<PostgresClient>, config: AppConfig) -> Self {
        Self { db, config }
    }
}

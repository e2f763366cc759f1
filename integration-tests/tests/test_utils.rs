use common::storage::{
    db::PostgresClient,
    schema,
    types::{agent::Agent, customer::Customer},
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Connects to the PostgreSQL named by `DATABASE_URL` and applies the
/// schema. The callers are `#[ignore]`d by default; run them with
/// `cargo test -- --ignored` against a disposable database.
pub async fn setup_test_database() -> PostgresClient {
    let url = std::env::var("DATABASE_URL")
        .expect("integration tests need DATABASE_URL pointing at a running PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to the test database");

    let db = PostgresClient::from_pool(pool);
    schema::apply(&db.pool)
        .await
        .expect("failed to apply the schema");

    db
}

/// Identifiers are randomized so repeated runs against the same database
/// never collide on unique constraints.
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

pub async fn seed_customer(db: &PostgresClient) -> Customer {
    Customer::upsert(db, &unique_id("cust"), Some("Test Customer"), None, None)
        .await
        .expect("failed to seed customer")
}

pub async fn seed_agent(db: &PostgresClient) -> Agent {
    let agent_id = unique_id("agent");
    let email = format!("{agent_id}@example.com");
    Agent::create(db, &agent_id, &email, "hash", Some("Test Agent"))
        .await
        .expect("failed to seed agent")
}

#![allow(clippy::module_name_repetitions)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, storage::db::PostgresClient};

/// End customer, created on first contact. Contact details are filled in
/// lazily as they become known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Customer {
    pub customer_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

const CUSTOMER_COLUMNS: &str = "customer_id, name, email, phone, created_at";

impl Customer {
    /// Insert-or-update. Fields passed as `None` never overwrite values
    /// already on record.
    pub async fn upsert(
        db: &PostgresClient,
        customer_id: &str,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Self, AppError> {
        let query = format!(
            "INSERT INTO customer (customer_id, name, email, phone)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (customer_id) DO UPDATE SET
                 name  = COALESCE(EXCLUDED.name, customer.name),
                 email = COALESCE(EXCLUDED.email, customer.email),
                 phone = COALESCE(EXCLUDED.phone, customer.phone)
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let customer = sqlx::query_as::<_, Customer>(&query)
            .bind(customer_id)
            .bind(name)
            .bind(email)
            .bind(phone)
            .fetch_one(&db.pool)
            .await?;

        Ok(customer)
    }

    pub async fn find_by_id(
        db: &PostgresClient,
        customer_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE customer_id = $1");
        let customer = sqlx::query_as::<_, Customer>(&query)
            .bind(customer_id)
            .fetch_optional(&db.pool)
            .await?;

        Ok(customer)
    }
}

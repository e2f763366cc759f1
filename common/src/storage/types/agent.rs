#![allow(clippy::module_name_repetitions)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, storage::db::PostgresClient, utils::validate};

/// Support agent account. Created at provisioning time; afterwards only
/// credential/profile updates touch the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Agent {
    pub agent_id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

const AGENT_COLUMNS: &str = "agent_id, email, name, password_hash, created_at";

/// Emails are stored lowercased so the unique constraint is case-insensitive
/// in practice.
fn normalized_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !validate::is_email(&email) {
        return Err(AppError::Validation(format!("invalid email: {email}")));
    }
    Ok(email)
}

impl Agent {
    pub async fn create(
        db: &PostgresClient,
        agent_id: &str,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> Result<Self, AppError> {
        let email = normalized_email(email)?;
        let query = format!(
            "INSERT INTO agent (agent_id, email, name, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {AGENT_COLUMNS}"
        );
        let agent = sqlx::query_as::<_, Agent>(&query)
            .bind(agent_id)
            .bind(&email)
            .bind(name)
            .bind(password_hash)
            .fetch_one(&db.pool)
            .await?;

        Ok(agent)
    }

    pub async fn find_by_email(
        db: &PostgresClient,
        email: &str,
    ) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {AGENT_COLUMNS} FROM agent WHERE email = $1");
        let agent = sqlx::query_as::<_, Agent>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&db.pool)
            .await?;

        Ok(agent)
    }

    pub async fn find_by_id(
        db: &PostgresClient,
        agent_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {AGENT_COLUMNS} FROM agent WHERE agent_id = $1");
        let agent = sqlx::query_as::<_, Agent>(&query)
            .bind(agent_id)
            .fetch_optional(&db.pool)
            .await?;

        Ok(agent)
    }

    pub async fn update_password_hash(
        db: &PostgresClient,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE agent SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email.trim().to_lowercase())
            .execute(&db.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("no agent with email {email}")));
        }
        Ok(())
    }

    /// Distinct customers this agent has talked with or holds bookings for,
    /// message contacts first.
    pub async fn customers(db: &PostgresClient, agent_id: &str) -> Result<Vec<String>, AppError> {
        let from_messages: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT customer_id FROM message WHERE agent_id = $1 ORDER BY customer_id",
        )
        .bind(agent_id)
        .fetch_all(&db.pool)
        .await?;

        let from_bookings: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT customer_id FROM booking WHERE agent_id = $1 ORDER BY customer_id",
        )
        .bind(agent_id)
        .fetch_all(&db.pool)
        .await?;

        let mut combined = from_messages;
        for customer_id in from_bookings {
            if !combined.contains(&customer_id) {
                combined.push(customer_id);
            }
        }
        Ok(combined)
    }
}

#![allow(clippy::module_name_repetitions)]
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    storage::db::PostgresClient,
    utils::id,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Customer,
    Agent,
    Bot,
    System,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Customer => "customer",
            Sender::Agent => "agent",
            Sender::Bot => "bot",
            Sender::System => "system",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the append-only message log. Rows are never updated or
/// deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Message {
    pub id: i64,
    pub message_id: String,
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub sender: Sender,
    pub message: String,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

pub struct NewMessage {
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub sender: Sender,
    pub body: String,
    pub meta: Option<Value>,
    /// External identifier; generated when absent.
    pub message_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone)]
pub struct MessageFilter {
    pub agent_id: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const MESSAGE_COLUMNS: &str =
    "id, message_id, customer_id, agent_id, sender, message, meta, created_at";

impl Message {
    pub async fn append(db: &PostgresClient, new: NewMessage) -> Result<Self, AppError> {
        let message_id = new.message_id.unwrap_or_else(id::message_id);
        let created_at = new.created_at.unwrap_or_else(Utc::now);
        let meta = new.meta.unwrap_or_else(|| Value::Object(Default::default()));

        let query = format!(
            "INSERT INTO message (message_id, customer_id, agent_id, sender, message, meta, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(&message_id)
            .bind(&new.customer_id)
            .bind(&new.agent_id)
            .bind(new.sender)
            .bind(&new.body)
            .bind(&meta)
            .bind(created_at)
            .fetch_one(&db.pool)
            .await?;

        Ok(message)
    }

    /// Messages of one customer in creation order, optionally narrowed to an
    /// agent and a `[start, end)` window.
    pub async fn list(
        db: &PostgresClient,
        customer_id: &str,
        filter: &MessageFilter,
    ) -> Result<Vec<Self>, AppError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {MESSAGE_COLUMNS} FROM message WHERE customer_id = "
        ));
        query.push_bind(customer_id);

        if let Some(agent_id) = &filter.agent_id {
            query.push(" AND agent_id = ").push_bind(agent_id);
        }
        if let Some(start) = filter.start {
            query.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            query.push(" AND created_at < ").push_bind(end);
        }
        query.push(" ORDER BY created_at");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ").push_bind(offset);
        }

        let messages = query
            .build_query_as::<Message>()
            .fetch_all(&db.pool)
            .await?;

        Ok(messages)
    }

    pub async fn last_for_customer(
        db: &PostgresClient,
        customer_id: &str,
        agent_id: Option<&str>,
    ) -> Result<Option<Self>, AppError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {MESSAGE_COLUMNS} FROM message WHERE customer_id = "
        ));
        query.push_bind(customer_id);
        if let Some(agent_id) = agent_id {
            query.push(" AND agent_id = ").push_bind(agent_id);
        }
        query.push(" ORDER BY created_at DESC LIMIT 1");

        let message = query
            .build_query_as::<Message>()
            .fetch_optional(&db.pool)
            .await?;

        Ok(message)
    }
}

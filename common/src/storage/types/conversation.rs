#![allow(clippy::module_name_repetitions)]
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, storage::db::PostgresClient};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Bot,
    Agent,
    Hybrid,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Bot => "bot",
            Mode::Agent => "agent",
            Mode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_mode(agent_id: Option<&str>) -> Mode {
    if agent_id.is_some() {
        Mode::Agent
    } else {
        Mode::Bot
    }
}

/// Pairing of a customer with (at most) one agent. The partial unique
/// indexes on the table guarantee a single row per pairing, including the
/// agent-less one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub mode: Mode,
    pub bot_assist: bool,
    pub agent_online: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

const CONVERSATION_COLUMNS: &str =
    "id, customer_id, agent_id, mode, bot_assist, agent_online, created_at, updated_at";

impl Conversation {
    /// Fetch the conversation for a pairing, creating it when missing.
    pub async fn open_or_get(
        db: &PostgresClient,
        customer_id: &str,
        agent_id: Option<&str>,
    ) -> Result<Self, AppError> {
        let query = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversation
             WHERE customer_id = $1 AND agent_id IS NOT DISTINCT FROM $2
             LIMIT 1"
        );
        let existing = sqlx::query_as::<_, Conversation>(&query)
            .bind(customer_id)
            .bind(agent_id)
            .fetch_optional(&db.pool)
            .await?;

        if let Some(conversation) = existing {
            return Ok(conversation);
        }

        let query = format!(
            "INSERT INTO conversation (customer_id, agent_id, mode, bot_assist)
             VALUES ($1, $2, $3, TRUE)
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let conversation = sqlx::query_as::<_, Conversation>(&query)
            .bind(customer_id)
            .bind(agent_id)
            .bind(default_mode(agent_id))
            .fetch_one(&db.pool)
            .await?;

        Ok(conversation)
    }

    pub async fn find_by_id(db: &PostgresClient, id: i64) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversation WHERE id = $1");
        let conversation = sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(&db.pool)
            .await?;

        Ok(conversation)
    }

    /// Partial update of the interaction state; absent fields keep their
    /// stored values.
    pub async fn set_state(
        db: &PostgresClient,
        id: i64,
        mode: Option<Mode>,
        bot_assist: Option<bool>,
        agent_online: Option<bool>,
    ) -> Result<Self, AppError> {
        let query = format!(
            "UPDATE conversation SET
                 mode         = COALESCE($2, mode),
                 bot_assist   = COALESCE($3, bot_assist),
                 agent_online = COALESCE($4, agent_online),
                 updated_at   = now()
             WHERE id = $1
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let conversation = sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .bind(mode)
            .bind(bot_assist)
            .bind(agent_online)
            .fetch_optional(&db.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no conversation {id}")))?;

        Ok(conversation)
    }
}

#![allow(clippy::module_name_repetitions)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use tracing::debug;

use crate::{error::AppError, storage::db::PostgresClient, utils::hash};

/// Cached digest of a customer's messages over a time range. The pair
/// (`cache_key`, `source_hash`) is the validity contract: the key addresses
/// the request, the hash pins the exact message set the digest was computed
/// from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Summary {
    pub id: i64,
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    #[sqlx(json)]
    pub sentences: Vec<String>,
    #[sqlx(json)]
    pub topics: Vec<String>,
    pub sentiment: Option<String>,
    pub message_count: i32,
    pub model_meta: Value,
    pub generated_at: DateTime<Utc>,
    pub cache_key: Option<String>,
    pub source_hash: Option<String>,
}

pub struct NewSummary {
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    pub sentences: Vec<String>,
    pub topics: Vec<String>,
    pub sentiment: Option<String>,
    pub message_count: i32,
    pub model_meta: Option<Value>,
    /// Derived from customer/agent/range when absent.
    pub cache_key: Option<String>,
    pub source_hash: Option<String>,
}

const SUMMARY_COLUMNS: &str = "id, customer_id, agent_id, range_start, range_end, sentences, \
     topics, sentiment, message_count, model_meta, generated_at, cache_key, source_hash";

impl Summary {
    /// A summary is only trustworthy while the messages it was computed
    /// from still hash to its recorded `source_hash`.
    pub fn is_fresh(&self, current_source_hash: &str) -> bool {
        self.source_hash.as_deref() == Some(current_source_hash)
    }

    pub async fn save(db: &PostgresClient, new: NewSummary) -> Result<Self, AppError> {
        let cache_key = new.cache_key.unwrap_or_else(|| {
            hash::summary_cache_key(
                &new.customer_id,
                new.agent_id.as_deref(),
                new.range_start,
                new.range_end,
            )
        });
        let model_meta = new.model_meta.unwrap_or_else(|| Value::Object(Default::default()));

        let query = format!(
            "INSERT INTO summary (customer_id, agent_id, range_start, range_end, sentences,
                                  topics, sentiment, message_count, model_meta, cache_key,
                                  source_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {SUMMARY_COLUMNS}"
        );
        let summary = sqlx::query_as::<_, Summary>(&query)
            .bind(&new.customer_id)
            .bind(&new.agent_id)
            .bind(new.range_start)
            .bind(new.range_end)
            .bind(Json(&new.sentences))
            .bind(Json(&new.topics))
            .bind(&new.sentiment)
            .bind(new.message_count)
            .bind(&model_meta)
            .bind(&cache_key)
            .bind(&new.source_hash)
            .fetch_one(&db.pool)
            .await?;

        Ok(summary)
    }

    pub async fn find_by_cache_key(
        db: &PostgresClient,
        cache_key: &str,
    ) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {SUMMARY_COLUMNS} FROM summary WHERE cache_key = $1");
        let summary = sqlx::query_as::<_, Summary>(&query)
            .bind(cache_key)
            .fetch_optional(&db.pool)
            .await?;

        Ok(summary)
    }

    /// Cache lookup honoring the content-address: a stored summary whose
    /// `source_hash` no longer matches the current message set is stale and
    /// is not returned.
    pub async fn find_valid(
        db: &PostgresClient,
        cache_key: &str,
        current_source_hash: &str,
    ) -> Result<Option<Self>, AppError> {
        let summary = Self::find_by_cache_key(db, cache_key).await?;
        Ok(summary.filter(|s| {
            let fresh = s.is_fresh(current_source_hash);
            if !fresh {
                debug!(cache_key, "cached summary is stale, ignoring");
            }
            fresh
        }))
    }

    pub async fn list_for_customer(
        db: &PostgresClient,
        customer_id: &str,
    ) -> Result<Vec<Self>, AppError> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM summary
             WHERE customer_id = $1
             ORDER BY generated_at DESC"
        );
        let summaries = sqlx::query_as::<_, Summary>(&query)
            .bind(customer_id)
            .fetch_all(&db.pool)
            .await?;

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(source_hash: Option<&str>) -> Summary {
        Summary {
            id: 1,
            customer_id: "cust_1".to_string(),
            agent_id: None,
            range_start: None,
            range_end: None,
            sentences: vec!["Customer asked about a refund.".to_string()],
            topics: vec!["refund".to_string()],
            sentiment: Some("neutral".to_string()),
            message_count: 4,
            model_meta: serde_json::json!({"model": "test"}),
            generated_at: Utc::now(),
            cache_key: Some("sum-abc".to_string()),
            source_hash: source_hash.map(str::to_string),
        }
    }

    #[test]
    fn matching_hash_is_fresh() {
        assert!(summary(Some("h1")).is_fresh("h1"));
    }

    #[test]
    fn mismatched_hash_is_stale() {
        assert!(!summary(Some("h1")).is_fresh("h2"));
    }

    #[test]
    fn missing_hash_is_always_stale() {
        assert!(!summary(None).is_fresh("h1"));
    }
}

#![allow(clippy::module_name_repetitions)]
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, storage::db::PostgresClient, utils::validate};

pub const DEFAULT_TTL_SECS: i64 = 300;

/// One-time code bound to a phone number. Usable at most once and only
/// before `valid_until`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Otp {
    pub id: i64,
    pub phone: String,
    pub code: String,
    pub valid_until: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

const OTP_COLUMNS: &str = "id, phone, code, valid_until, used, created_at";

impl Otp {
    pub async fn create(
        db: &PostgresClient,
        phone: &str,
        code: &str,
        valid_for: Duration,
    ) -> Result<Self, AppError> {
        if !validate::is_phone(phone) {
            return Err(AppError::Validation(format!("invalid phone: {phone}")));
        }
        let valid_until = Utc::now() + valid_for;

        let query = format!(
            "INSERT INTO otp (phone, code, valid_until)
             VALUES ($1, $2, $3)
             RETURNING {OTP_COLUMNS}"
        );
        let otp = sqlx::query_as::<_, Otp>(&query)
            .bind(phone)
            .bind(code)
            .bind(valid_until)
            .fetch_one(&db.pool)
            .await?;

        Ok(otp)
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.valid_until
    }

    /// Verify a code for a phone number. The newest matching row that is
    /// unused and unexpired gets marked used in the same statement, so a
    /// code can never verify twice even under concurrent attempts. Used or
    /// expired rows never match, regardless of code value.
    pub async fn verify(db: &PostgresClient, phone: &str, code: &str) -> Result<bool, AppError> {
        let marked: Option<i64> = sqlx::query_scalar(
            "UPDATE otp SET used = TRUE
             WHERE id = (
                 SELECT id FROM otp
                 WHERE phone = $1 AND code = $2 AND used = FALSE AND valid_until > now()
                 ORDER BY created_at DESC
                 LIMIT 1
             )
             RETURNING id",
        )
        .bind(phone)
        .bind(code)
        .fetch_optional(&db.pool)
        .await?;

        Ok(marked.is_some())
    }
}

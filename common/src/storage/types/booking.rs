#![allow(clippy::module_name_repetitions)]
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, storage::db::PostgresClient, utils::id};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Rescheduled,
    #[default]
    Pending,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rescheduled => "rescheduled",
            BookingStatus::Pending => "pending",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }

    /// Lifecycle: created as pending or confirmed; may move on to
    /// rescheduled or cancelled; nothing leaves cancelled. Repeat
    /// reschedules are allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::{Cancelled, Confirmed, Pending, Rescheduled};
        matches!(
            (self, next),
            (Pending, Confirmed | Rescheduled | Cancelled)
                | (Confirmed, Rescheduled | Cancelled)
                | (Rescheduled, Rescheduled | Confirmed | Cancelled)
        )
    }

    pub fn is_valid_at_creation(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_transition(from: BookingStatus, to: BookingStatus) -> AppError {
    AppError::Validation(format!(
        "Invalid booking transition: {} -> {}",
        from.as_str(),
        to.as_str()
    ))
}

fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(invalid_transition(from, to))
    }
}

/// Calendar booking. `start`/`end` form a half-open interval. Duplicate
/// creation is prevented purely by the unique constraints on `booking_ref`
/// and `idempotency_key`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Booking {
    pub id: i64,
    pub booking_ref: String,
    pub idempotency_key: Option<String>,
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub calendar_id: String,
    pub event_id: String,
    pub service_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct NewBooking {
    /// Generated (`BK-…`) when absent.
    pub booking_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub calendar_id: String,
    pub event_id: String,
    pub service_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub paid: bool,
}

// "end" is reserved; both interval columns stay quoted and are aliased to
// the struct field names on the way out.
const BOOKING_COLUMNS: &str = "id, booking_ref, idempotency_key, customer_id, agent_id, \
     calendar_id, event_id, service_id, \"start\" AS start_at, \"end\" AS end_at, \
     status, paid, created_at, updated_at";

impl Booking {
    pub async fn create(db: &PostgresClient, new: NewBooking) -> Result<Self, AppError> {
        if !new.status.is_valid_at_creation() {
            return Err(AppError::Validation(format!(
                "bookings cannot be created as {}",
                new.status.as_str()
            )));
        }
        if new.start_at >= new.end_at {
            return Err(AppError::Validation(
                "booking interval must satisfy start < end".to_string(),
            ));
        }

        let booking_ref = new.booking_ref.unwrap_or_else(id::booking_ref);
        let query = format!(
            "INSERT INTO booking (booking_ref, idempotency_key, customer_id, agent_id,
                                  calendar_id, event_id, service_id, \"start\", \"end\",
                                  status, paid)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(&booking_ref)
            .bind(&new.idempotency_key)
            .bind(&new.customer_id)
            .bind(&new.agent_id)
            .bind(&new.calendar_id)
            .bind(&new.event_id)
            .bind(&new.service_id)
            .bind(new.start_at)
            .bind(new.end_at)
            .bind(new.status)
            .bind(new.paid)
            .fetch_one(&db.pool)
            .await?;

        Ok(booking)
    }

    pub async fn find_by_ref(
        db: &PostgresClient,
        booking_ref: &str,
    ) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE booking_ref = $1");
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(booking_ref)
            .fetch_optional(&db.pool)
            .await?;

        Ok(booking)
    }

    /// Safe-retry lookup: a caller whose insert was rejected can resolve the
    /// booking its earlier attempt created.
    pub async fn find_by_idempotency_key(
        db: &PostgresClient,
        idempotency_key: &str,
    ) -> Result<Option<Self>, AppError> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE idempotency_key = $1");
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(idempotency_key)
            .fetch_optional(&db.pool)
            .await?;

        Ok(booking)
    }

    pub async fn list_for_customer(
        db: &PostgresClient,
        customer_id: &str,
        upcoming_only: bool,
    ) -> Result<Vec<Self>, AppError> {
        let query = if upcoming_only {
            format!(
                "SELECT {BOOKING_COLUMNS} FROM booking
                 WHERE customer_id = $1 AND \"end\" >= now()
                 ORDER BY \"start\""
            )
        } else {
            format!(
                "SELECT {BOOKING_COLUMNS} FROM booking
                 WHERE customer_id = $1
                 ORDER BY \"start\""
            )
        };
        let bookings = sqlx::query_as::<_, Booking>(&query)
            .bind(customer_id)
            .fetch_all(&db.pool)
            .await?;

        Ok(bookings)
    }

    pub async fn update_status(
        db: &PostgresClient,
        booking_ref: &str,
        next: BookingStatus,
    ) -> Result<Self, AppError> {
        let current = Self::find_by_ref(db, booking_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no booking {booking_ref}")))?;
        ensure_transition(current.status, next)?;

        let query = format!(
            "UPDATE booking SET status = $1, updated_at = now()
             WHERE booking_ref = $2
             RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(next)
            .bind(booking_ref)
            .fetch_one(&db.pool)
            .await?;

        Ok(booking)
    }

    pub async fn reschedule(
        db: &PostgresClient,
        booking_ref: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if new_start >= new_end {
            return Err(AppError::Validation(
                "booking interval must satisfy start < end".to_string(),
            ));
        }
        let current = Self::find_by_ref(db, booking_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no booking {booking_ref}")))?;
        ensure_transition(current.status, BookingStatus::Rescheduled)?;

        let query = format!(
            "UPDATE booking SET \"start\" = $1, \"end\" = $2, status = $3, updated_at = now()
             WHERE booking_ref = $4
             RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(new_start)
            .bind(new_end)
            .bind(BookingStatus::Rescheduled)
            .bind(booking_ref)
            .fetch_one(&db.pool)
            .await?;

        Ok(booking)
    }

    pub async fn cancel(db: &PostgresClient, booking_ref: &str) -> Result<Self, AppError> {
        Self::update_status(db, booking_ref, BookingStatus::Cancelled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::{Cancelled, Confirmed, Pending, Rescheduled};

    #[test]
    fn creation_statuses() {
        assert!(Pending.is_valid_at_creation());
        assert!(Confirmed.is_valid_at_creation());
        assert!(!Rescheduled.is_valid_at_creation());
        assert!(!Cancelled.is_valid_at_creation());
    }

    #[test]
    fn allowed_transitions() {
        for (from, to) in [
            (Pending, Confirmed),
            (Pending, Rescheduled),
            (Pending, Cancelled),
            (Confirmed, Rescheduled),
            (Confirmed, Cancelled),
            (Rescheduled, Rescheduled),
            (Rescheduled, Confirmed),
            (Rescheduled, Cancelled),
        ] {
            assert!(
                from.can_transition_to(to),
                "{} -> {} should be allowed",
                from.as_str(),
                to.as_str()
            );
            assert!(ensure_transition(from, to).is_ok());
        }
    }

    #[test]
    fn nothing_leaves_cancelled() {
        for to in [Pending, Confirmed, Rescheduled, Cancelled] {
            assert!(!Cancelled.can_transition_to(to));
        }
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn rejected_transitions_carry_both_states() {
        let err = ensure_transition(Cancelled, Confirmed).expect_err("must reject");
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("cancelled"));
                assert!(msg.contains("confirmed"));
            }
            other => panic!("expected Validation, got {other}"),
        }
    }

    #[test]
    fn no_self_loops_outside_reschedule() {
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(Rescheduled.can_transition_to(Rescheduled));
    }

    #[test]
    fn status_wire_form() {
        assert_eq!(BookingStatus::default(), Pending);
        assert_eq!(Pending.as_str(), "pending");
        assert_eq!(format!("{Rescheduled}"), "rescheduled");
        assert_eq!(
            serde_json::to_value(Confirmed).expect("serialize"),
            serde_json::Value::String("confirmed".to_string())
        );
    }
}

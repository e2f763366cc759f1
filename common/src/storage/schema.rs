use sqlx::PgPool;

use crate::error::AppError;

// Every statement is re-appliable: tables and indexes are only created when
// absent, so the initializer can run on every boot against live data.
//
// `booking."start"` / `booking."end"` keep the column names of the existing
// data set; `end` is a reserved word and stays quoted everywhere.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // Referenced tables first
    "CREATE TABLE IF NOT EXISTS customer (
        customer_id TEXT PRIMARY KEY,
        name        TEXT,
        email       TEXT,
        phone       TEXT,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS agent (
        agent_id      TEXT PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        name          TEXT,
        password_hash TEXT,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    // Append-only message log
    "CREATE TABLE IF NOT EXISTS message (
        id          BIGSERIAL PRIMARY KEY,
        message_id  TEXT NOT NULL UNIQUE,
        customer_id TEXT NOT NULL REFERENCES customer (customer_id),
        agent_id    TEXT REFERENCES agent (agent_id),
        sender      TEXT NOT NULL,
        message     TEXT NOT NULL,
        meta        JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS booking (
        id              BIGSERIAL PRIMARY KEY,
        booking_ref     TEXT NOT NULL UNIQUE,
        idempotency_key TEXT UNIQUE,
        customer_id     TEXT NOT NULL REFERENCES customer (customer_id),
        agent_id        TEXT REFERENCES agent (agent_id),
        calendar_id     TEXT NOT NULL,
        event_id        TEXT NOT NULL,
        service_id      TEXT NOT NULL,
        \"start\"       TIMESTAMPTZ NOT NULL,
        \"end\"         TIMESTAMPTZ NOT NULL,
        status          TEXT NOT NULL CHECK (status IN ('confirmed', 'cancelled', 'rescheduled', 'pending')),
        paid            BOOLEAN NOT NULL DEFAULT FALSE,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at      TIMESTAMPTZ
    )",
    // Keyed by raw phone number, no referential integrity
    "CREATE TABLE IF NOT EXISTS otp (
        id          BIGSERIAL PRIMARY KEY,
        phone       TEXT NOT NULL,
        code        TEXT NOT NULL,
        valid_until TIMESTAMPTZ NOT NULL,
        used        BOOLEAN NOT NULL DEFAULT FALSE,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    // Keyed by raw customer id, no referential integrity
    "CREATE TABLE IF NOT EXISTS summary (
        id            BIGSERIAL PRIMARY KEY,
        customer_id   TEXT NOT NULL,
        agent_id      TEXT,
        range_start   TIMESTAMPTZ,
        range_end     TIMESTAMPTZ,
        sentences     JSONB NOT NULL DEFAULT '[]'::jsonb,
        topics        JSONB NOT NULL DEFAULT '[]'::jsonb,
        sentiment     TEXT,
        message_count INTEGER NOT NULL DEFAULT 0,
        model_meta    JSONB NOT NULL DEFAULT '{}'::jsonb,
        generated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        cache_key     TEXT UNIQUE,
        source_hash   TEXT
    )",
    "CREATE TABLE IF NOT EXISTS conversation (
        id           BIGSERIAL PRIMARY KEY,
        customer_id  TEXT NOT NULL REFERENCES customer (customer_id),
        agent_id     TEXT REFERENCES agent (agent_id),
        mode         TEXT NOT NULL DEFAULT 'bot',
        bot_assist   BOOLEAN NOT NULL DEFAULT FALSE,
        agent_online BOOLEAN NOT NULL DEFAULT FALSE,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at   TIMESTAMPTZ
    )",
    // At most one conversation per (customer, agent) pairing. A plain
    // composite UNIQUE treats NULL agents as distinct, so the agent-less
    // pairing gets its own partial index.
    "CREATE UNIQUE INDEX IF NOT EXISTS uniq_conversation_pair
        ON conversation (customer_id, agent_id) WHERE agent_id IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS uniq_conversation_customer_solo
        ON conversation (customer_id) WHERE agent_id IS NULL",
    // Secondary indexes for the hot query paths
    "CREATE INDEX IF NOT EXISTS idx_message_customer_agent_created
        ON message (customer_id, agent_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_booking_customer
        ON booking (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_summary_customer_range
        ON summary (customer_id, range_start, range_end)",
    "CREATE INDEX IF NOT EXISTS idx_otp_phone
        ON otp (phone)",
];

pub async fn apply(pool: &PgPool) -> Result<(), AppError> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

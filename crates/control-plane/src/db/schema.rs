//! Schema bootstrap.
//!
//! Tables are created idempotently at startup so a fresh database needs no
//! separate migration step.

use crate::db::DbPool;
use crate::error::AppResult;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflows (
        id              UUID PRIMARY KEY,
        name            TEXT NOT NULL,
        description     TEXT NOT NULL DEFAULT '',
        original_prompt TEXT NOT NULL DEFAULT '',
        steps           JSONB NOT NULL DEFAULT '[]',
        created_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS executions (
        id              UUID PRIMARY KEY,
        workflow_id     UUID NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
        status          TEXT NOT NULL,
        started_at      TIMESTAMPTZ NOT NULL,
        completed_at    TIMESTAMPTZ,
        error_message   TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS execution_steps (
        id              UUID PRIMARY KEY,
        execution_id    UUID NOT NULL REFERENCES executions(id) ON DELETE CASCADE,
        step_index      INTEGER NOT NULL,
        name            TEXT NOT NULL,
        agent_type      TEXT NOT NULL,
        status          TEXT NOT NULL,
        result_payload  JSONB,
        error_message   TEXT,
        started_at      TIMESTAMPTZ,
        completed_at    TIMESTAMPTZ,
        UNIQUE (execution_id, step_index)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_executions_workflow ON executions(workflow_id)",
    "CREATE INDEX IF NOT EXISTS idx_executions_started ON executions(started_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_execution_steps_execution ON execution_steps(execution_id)",
];

/// Create all tables and indexes if they don't exist.
pub async fn ensure_schema(pool: &DbPool) -> AppResult<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = SCHEMA_STATEMENTS.len(), "Database schema ensured");
    Ok(())
}

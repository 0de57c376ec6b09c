//! Revoked session artifacts.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Record `jti` as revoked until its natural expiry.
///
/// Rows whose artifacts have expired anyway are pruned on the way.
pub(super) async fn revoke_session(
    pool: &PgPool,
    jti: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let query = "DELETE FROM revoked_sessions WHERE expires_at < NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to prune revoked sessions")?;

    let query = r"
        INSERT INTO revoked_sessions (jti, expires_at)
        VALUES ($1, $2)
        ON CONFLICT (jti) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(jti)
        .bind(expires_at)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke session")?;

    Ok(())
}

pub(super) async fn is_session_revoked(pool: &PgPool, jti: Uuid) -> Result<bool> {
    let query = "SELECT EXISTS (SELECT 1 FROM revoked_sessions WHERE jti = $1) AS revoked";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(jti)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to lookup revoked session")?;

    row.try_get("revoked")
        .context("failed to decode revoked flag")
}

/// Session model and database operations
///
/// A session binds an opaque token to a user until `expires_at`. Only the
/// SHA-256 digest of the token is persisted; the clear token exists solely
/// in the cookie handed to the client.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Server-side session record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,

    /// SHA-256 hex digest of the session token
    #[serde(skip_serializing, default)]
    pub token_hash: String,

    /// User the session authenticates
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

/// Input for persisting a new session
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub token_hash: String,
    pub owner_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns true once the session has reached its expiry instant
    pub fn has_expired(&self) -> bool {
        self.has_expired_at(Utc::now())
    }

    /// Expiry check against an explicit clock
    ///
    /// A session is still valid strictly before `expires_at` and expired
    /// at or after it.
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Inserts a session
    pub async fn create<'e, E>(executor: E, data: CreateSession) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token_hash, owner_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, token_hash, owner_id, created_at, expires_at
            "#,
        )
        .bind(data.token_hash)
        .bind(data.owner_id)
        .bind(data.expires_at)
        .fetch_one(executor)
        .await
    }

    /// Looks a session up by token digest
    pub async fn find_by_token_hash<'e, E>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, token_hash, owner_id, created_at, expires_at
            FROM sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a session by token digest
    ///
    /// # Returns
    ///
    /// true if a row was removed
    pub async fn delete_by_token_hash<'e, E>(executor: E, token_hash: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            token_hash: "0".repeat(64),
            owner_id: Uuid::new_v4(),
            created_at: expires_at - Duration::hours(1),
            expires_at,
        }
    }

    #[test]
    fn test_not_expired_before_expiry() {
        let expires_at = Utc::now();
        let session = session_expiring_at(expires_at);

        assert!(!session.has_expired_at(expires_at - Duration::milliseconds(1)));
    }

    #[test]
    fn test_expired_at_and_after_expiry() {
        let expires_at = Utc::now();
        let session = session_expiring_at(expires_at);

        assert!(session.has_expired_at(expires_at));
        assert!(session.has_expired_at(expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_has_expired_uses_wall_clock() {
        assert!(session_expiring_at(Utc::now() - Duration::minutes(5)).has_expired());
        assert!(!session_expiring_at(Utc::now() + Duration::minutes(5)).has_expired());
    }
}

/// Cookie-based session store
///
/// Issues, resolves and destroys opaque session tokens bound to a user.
///
/// # Security
///
/// - **Token**: 32 bytes from the OS RNG, hex encoded (64 chars)
/// - **Storage**: only the SHA-256 digest of the token is persisted
/// - **Transport**: `HttpOnly`, `Path=/`, `SameSite=Lax` cookie whose
///   `Max-Age` equals the session TTL; `Secure` when configured
///
/// Sessions are independent: logging in again never invalidates an earlier
/// session of the same user.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use axum_extra::extract::cookie::CookieJar;
/// use couchsport_shared::auth::session::{SessionConfig, SessionStore};
/// use couchsport_shared::db::memory::MemoryRepository;
/// use couchsport_shared::db::repository::UserRepository;
/// use couchsport_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = Arc::new(MemoryRepository::new());
/// let (user, _) = repo
///     .create_user_with_profile(CreateUser {
///         email: "rider@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     })
///     .await?;
///
/// let sessions = SessionStore::new(repo, SessionConfig::default());
/// let issued = sessions.create(user.id).await?;
///
/// let jar = CookieJar::new().add(sessions.create_cookie(&issued));
/// let session = sessions.get_session(&jar).await?;
/// assert_eq!(session.owner_id, user.id);
///
/// assert!(sessions.destroy(&jar).await?);
/// # Ok(())
/// # }
/// ```

use crate::db::error::StoreError;
use crate::db::repository::Repository;
use crate::models::session::{CreateSession, Session};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Number of random bytes in a session token
const TOKEN_BYTES: usize = 32;

/// Default session lifetime: 7 days
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted session lifetime: 1 year
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Default cookie name
pub const DEFAULT_COOKIE_NAME: &str = "couchsport_session";

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No cookie, or the token is unknown
    #[error("Session not found")]
    NotFound,

    /// The session reached its expiry
    #[error("Session expired")]
    Expired,

    /// Storage failure
    #[error("Session storage error: {0}")]
    Store(#[from] StoreError),
}

/// Session lifetime and cookie settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session lifetime in seconds; also the cookie `Max-Age`
    pub ttl_seconds: u64,

    pub cookie_name: String,

    /// Adds the `Secure` cookie attribute
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure: false,
        }
    }
}

/// A freshly created session together with its clear token
///
/// The token is returned to the caller instead of being kept anywhere in
/// the store; it cannot be recovered once this value is dropped.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Issues and resolves sessions
#[derive(Clone)]
pub struct SessionStore {
    repo: Arc<dyn Repository>,
    config: SessionConfig,
}

/// Generates a random session token (64 hex chars)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a token, as stored
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl SessionStore {
    pub fn new(repo: Arc<dyn Repository>, config: SessionConfig) -> Self {
        Self { repo, config }
    }

    /// Creates a session for `owner_id`, expiring after the configured TTL
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the session cannot be persisted
    pub async fn create(&self, owner_id: Uuid) -> Result<IssuedSession, SessionError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::seconds(self.ttl_seconds_i64());

        let session = self
            .repo
            .insert_session(CreateSession {
                token_hash: hash_token(&token),
                owner_id,
                expires_at,
            })
            .await?;

        info!(user_id = %owner_id, session_id = %session.id, "Session created");
        Ok(IssuedSession { token, session })
    }

    /// Transport cookie carrying the issued token
    pub fn create_cookie(&self, issued: &IssuedSession) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), issued.token.clone()))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.config.secure)
            .max_age(time::Duration::seconds(self.ttl_seconds_i64()))
            .build()
    }

    /// Cookie that makes the client drop its session cookie
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), String::new()))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.config.secure)
            .max_age(time::Duration::ZERO)
            .build()
    }

    /// Session token carried by the request, if any
    pub fn token_from(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.config.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Resolves the session referenced by the request cookie
    ///
    /// Expiry is not checked here; see [`SessionStore::has_expired`].
    ///
    /// # Errors
    ///
    /// - `SessionError::NotFound` if the cookie is absent or the token unknown
    /// - `SessionError::Store` on storage failure
    pub async fn get_session(&self, jar: &CookieJar) -> Result<Session, SessionError> {
        let token = self.token_from(jar).ok_or(SessionError::NotFound)?;

        self.repo
            .find_session(&hash_token(&token))
            .await?
            .ok_or(SessionError::NotFound)
    }

    /// Resolves the request's session and enforces its expiry
    ///
    /// An expired session is destroyed before the error is returned.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotFound` if the cookie is absent or the token unknown
    /// - `SessionError::Expired` if the session reached its expiry
    /// - `SessionError::Store` on storage failure
    pub async fn get_valid_session(&self, jar: &CookieJar) -> Result<Session, SessionError> {
        let session = self.get_session(jar).await?;
        if !self.has_expired(&session) {
            return Ok(session);
        }

        // Best effort; the caller is rejected either way
        match self.destroy(jar).await {
            Ok(removed) => debug!(session_id = %session.id, removed, "Expired session destroyed"),
            Err(e) => warn!(session_id = %session.id, error = %e, "Failed to destroy expired session"),
        }
        Err(SessionError::Expired)
    }

    /// True once `now` has reached the session's expiry
    pub fn has_expired(&self, session: &Session) -> bool {
        session.has_expired()
    }

    /// Removes the session referenced by the request cookie
    ///
    /// Idempotent: a missing cookie or an unknown token yields `Ok(false)`.
    pub async fn destroy(&self, jar: &CookieJar) -> Result<bool, SessionError> {
        let Some(token) = self.token_from(jar) else {
            return Ok(false);
        };

        let removed = self.repo.delete_session(&hash_token(&token)).await?;
        debug!(removed, "Session destroy requested");
        Ok(removed)
    }

    fn ttl_seconds_i64(&self) -> i64 {
        // The bound keeps `now + ttl` far inside chrono's range
        self.config.ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64
    }
}

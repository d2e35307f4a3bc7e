/// Repository seam between the services and storage
///
/// Services only see these traits, so the same session, authorization and
/// page logic runs against PostgreSQL in production
/// ([`PgRepository`](super::postgres::PgRepository)) and against the
/// in-memory store in tests and local development
/// ([`MemoryRepository`](super::memory::MemoryRepository)).
///
/// Every multi-row write (`create_user_with_profile`, `insert_page`,
/// `update_page`) is atomic in both implementations.

use super::error::StoreError;
use crate::models::activity::Activity;
use crate::models::image::Image;
use crate::models::page::{NewPage, Page, PageChanges, PageFilter};
use crate::models::profile::{Profile, UpdateProfile};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use uuid::Uuid;

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a user and its empty profile in one transaction
    async fn create_user_with_profile(&self, data: CreateUser) -> Result<(User, Profile), StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Profile persistence
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Profile owned by a user
    async fn find_profile_by_owner(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: UpdateProfile,
    ) -> Result<Option<Profile>, StoreError>;
}

/// Session persistence, keyed by token digest
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, data: CreateSession) -> Result<Session, StoreError>;

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError>;

    /// Returns true if a session was removed
    async fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError>;
}

/// Page aggregate persistence
#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Pages matching `filter`, images and activities always loaded
    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError>;

    /// Single page with images and activities
    async fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError>;

    /// Inserts the page, its images and its activity links atomically
    async fn insert_page(&self, data: NewPage) -> Result<Page, StoreError>;

    /// Applies `changes` atomically
    ///
    /// Images are replaced wholesale when `changes.images` is `Some`;
    /// activity links are diffed when `changes.activity_ids` is `Some`.
    ///
    /// # Returns
    ///
    /// The reloaded page, or None if it doesn't exist
    async fn update_page(&self, id: Uuid, changes: PageChanges) -> Result<Option<Page>, StoreError>;

    /// Hard delete; returns true if the page existed
    async fn delete_page(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Returns true if the page exists
    async fn set_page_public(&self, id: Uuid, public: bool) -> Result<bool, StoreError>;

    async fn find_image(&self, id: Uuid) -> Result<Option<Image>, StoreError>;

    async fn delete_image(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Activity catalogue ordered by name
    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError>;
}

/// Everything the services need from storage
#[async_trait]
pub trait Repository: UserRepository + ProfileRepository + SessionRepository + PageRepository {
    /// Connectivity check used by the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;
}

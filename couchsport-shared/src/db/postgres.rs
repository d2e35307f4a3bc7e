/// PostgreSQL repository
///
/// Composes the model-level queries into the [`Repository`] operations.
/// Multi-row writes run in a single transaction; listing loads page rows
/// first and then batch-loads associations with `= ANY($1)` so the number
/// of queries does not grow with the number of pages.
///
/// # Example
///
/// ```no_run
/// use couchsport_shared::db::pool::{create_pool, DatabaseConfig};
/// use couchsport_shared::db::postgres::PgRepository;
/// use couchsport_shared::db::repository::PageRepository;
/// use couchsport_shared::models::page::PageFilter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let repo = PgRepository::new(pool);
/// let pages = repo.list_pages(&PageFilter::default()).await?;
/// # Ok(())
/// # }
/// ```

use super::error::StoreError;
use super::pool::health_check;
use super::repository::{PageRepository, ProfileRepository, Repository, SessionRepository, UserRepository};
use crate::models::activity::{Activity, ActivityDiff};
use crate::models::image::Image;
use crate::models::page::{NewPage, Page, PageChanges, PageFilter};
use crate::models::profile::{Profile, UpdateProfile};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// [`Repository`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for shutdown and migrations
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads images and activities (always) plus followers and owner
    /// (on demand) for a batch of pages
    async fn load_associations(
        conn: &mut PgConnection,
        mut pages: Vec<Page>,
        with_followers: bool,
        with_owner: bool,
    ) -> Result<Vec<Page>, sqlx::Error> {
        if pages.is_empty() {
            return Ok(pages);
        }

        let ids: Vec<Uuid> = pages.iter().map(|p| p.id).collect();

        let mut images: HashMap<Uuid, Vec<Image>> = HashMap::new();
        for image in Image::find_for_pages(&mut *conn, &ids).await? {
            images.entry(image.page_id).or_default().push(image);
        }

        let mut activities: HashMap<Uuid, Vec<Activity>> = HashMap::new();
        for row in Activity::find_for_pages(&mut *conn, &ids).await? {
            activities.entry(row.page_id).or_default().push(row.into());
        }

        let mut followers: HashMap<Uuid, Vec<Profile>> = HashMap::new();
        if with_followers {
            let links = Page::followers_for_pages(&mut *conn, &ids).await?;
            let profile_ids: Vec<Uuid> = links.iter().map(|l| l.profile_id).collect();
            let profiles: HashMap<Uuid, Profile> = Profile::find_many(&mut *conn, &profile_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

            for link in links {
                if let Some(profile) = profiles.get(&link.profile_id) {
                    followers.entry(link.page_id).or_default().push(profile.clone());
                }
            }
        }

        let mut owners: HashMap<Uuid, Profile> = HashMap::new();
        if with_owner {
            let owner_ids: Vec<Uuid> = pages.iter().map(|p| p.owner_id).collect();
            owners = Profile::find_many(&mut *conn, &owner_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();
        }

        for page in &mut pages {
            page.images = images.remove(&page.id).unwrap_or_default();
            page.activities = activities.remove(&page.id).unwrap_or_default();
            if with_followers {
                page.followers = Some(followers.remove(&page.id).unwrap_or_default());
            }
            if with_owner {
                page.owner = owners.get(&page.owner_id).cloned();
            }
        }

        Ok(pages)
    }

    async fn load_one(conn: &mut PgConnection, id: Uuid) -> Result<Option<Page>, sqlx::Error> {
        let Some(page) = Page::find_by_id(&mut *conn, id).await? else {
            return Ok(None);
        };

        let mut loaded = Self::load_associations(conn, vec![page], false, false).await?;
        Ok(loaded.pop())
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn create_user_with_profile(&self, data: CreateUser) -> Result<(User, Profile), StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = User::create(&mut *tx, data).await?;
        let profile = Profile::create_for_owner(&mut *tx, user.id).await?;

        tx.commit().await?;

        debug!(user_id = %user.id, profile_id = %profile.id, "Created user with profile");
        Ok((user, profile))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }
}

#[async_trait]
impl ProfileRepository for PgRepository {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(Profile::find_by_id(&self.pool, id).await?)
    }

    async fn find_profile_by_owner(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(Profile::find_by_owner(&self.pool, user_id).await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: UpdateProfile,
    ) -> Result<Option<Profile>, StoreError> {
        Ok(Profile::update(&self.pool, id, changes).await?)
    }
}

#[async_trait]
impl SessionRepository for PgRepository {
    async fn insert_session(&self, data: CreateSession) -> Result<Session, StoreError> {
        Ok(Session::create(&self.pool, data).await?)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(Session::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(Session::delete_by_token_hash(&self.pool, token_hash).await?)
    }
}

#[async_trait]
impl PageRepository for PgRepository {
    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let pages = Page::list(&mut *conn, filter).await?;
        let pages =
            Self::load_associations(&mut conn, pages, filter.with_followers, filter.with_owner)
                .await?;

        Ok(pages)
    }

    async fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::load_one(&mut conn, id).await?)
    }

    async fn insert_page(&self, data: NewPage) -> Result<Page, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut page = Page::insert(&mut *tx, &data).await?;
        page.images = Image::insert_many(&mut tx, page.id, &data.images).await?;
        Activity::link(&mut *tx, page.id, &data.activity_ids).await?;

        let mut loaded = Self::load_associations(&mut tx, vec![page], false, false).await?;
        tx.commit().await?;

        let page = loaded.pop().ok_or(StoreError::NotFound)?;
        debug!(page_id = %page.id, owner_id = %page.owner_id, images = page.images.len(), "Inserted page");
        Ok(page)
    }

    async fn update_page(&self, id: Uuid, changes: PageChanges) -> Result<Option<Page>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if Page::lock(&mut *tx, id).await?.is_none() {
            return Ok(None);
        }

        if let Some(images) = &changes.images {
            let removed = Image::delete_for_page(&mut *tx, id).await?;
            Image::insert_many(&mut tx, id, images).await?;
            debug!(page_id = %id, removed, inserted = images.len(), "Replaced page images");
        }

        if let Some(submitted) = &changes.activity_ids {
            let existing = Activity::linked_ids(&mut *tx, id).await?;
            let diff = ActivityDiff::compute(&existing, submitted);

            Activity::unlink(&mut *tx, id, &diff.remove).await?;
            Activity::link(&mut *tx, id, &diff.add).await?;
            debug!(
                page_id = %id,
                removed = diff.remove.len(),
                added = diff.add.len(),
                "Applied activity diff"
            );
        }

        Page::update_fields(&mut *tx, id, &changes).await?;

        let page = Self::load_one(&mut tx, id).await?;
        tx.commit().await?;

        Ok(page)
    }

    async fn delete_page(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Page::delete(&self.pool, id).await?)
    }

    async fn set_page_public(&self, id: Uuid, public: bool) -> Result<bool, StoreError> {
        Ok(Page::set_public(&self.pool, id, public).await?)
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<Image>, StoreError> {
        Ok(Image::find_by_id(&self.pool, id).await?)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Image::delete(&self.pool, id).await?)
    }

    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError> {
        Ok(Activity::list(&self.pool).await?)
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }
}

/// In-memory repository
///
/// Implements the full [`Repository`] contract on top of a single
/// `tokio::sync::RwLock`, which makes every operation atomic. It mirrors
/// the PostgreSQL constraints the services rely on: unique emails, profile
/// and activity foreign keys, and cascading deletes of images and links.
///
/// Used by the integration tests and by the server when no database URL is
/// configured.
///
/// # Example
///
/// ```
/// use couchsport_shared::db::memory::MemoryRepository;
/// use couchsport_shared::db::repository::UserRepository;
/// use couchsport_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = MemoryRepository::new();
/// let (user, profile) = repo
///     .create_user_with_profile(CreateUser {
///         email: "rider@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     })
///     .await?;
/// assert_eq!(profile.owner_id, user.id);
/// # Ok(())
/// # }
/// ```

use super::error::StoreError;
use super::repository::{PageRepository, ProfileRepository, Repository, SessionRepository, UserRepository};
use crate::models::activity::{Activity, ActivityDiff};
use crate::models::image::{Image, NewImage};
use crate::models::page::{NewPage, Page, PageChanges, PageFilter};
use crate::models::profile::{Profile, UpdateProfile};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    sessions: HashMap<String, Session>,
    pages: HashMap<Uuid, Page>,
    images: HashMap<Uuid, Image>,
    activities: HashMap<Uuid, Activity>,
    /// (page_id, activity_id)
    page_activities: Vec<(Uuid, Uuid)>,
    /// (page_id, profile_id)
    page_followers: Vec<(Uuid, Uuid)>,
}

impl State {
    fn ensure_activities_exist(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        match ids.iter().find(|id| !self.activities.contains_key(*id)) {
            Some(missing) => Err(StoreError::Constraint(format!(
                "activity {} does not exist",
                missing
            ))),
            None => Ok(()),
        }
    }

    fn insert_images(&mut self, page_id: Uuid, images: &[NewImage]) {
        let now = Utc::now();
        for (position, image) in images.iter().enumerate() {
            let id = Uuid::new_v4();
            self.images.insert(
                id,
                Image {
                    id,
                    page_id,
                    url: image.url.clone(),
                    position: position as i32,
                    created_at: now,
                },
            );
        }
    }

    fn link_activities(&mut self, page_id: Uuid, ids: &[Uuid]) {
        for id in ids {
            if !self.page_activities.contains(&(page_id, *id)) {
                self.page_activities.push((page_id, *id));
            }
        }
    }

    fn linked_activity_ids(&self, page_id: Uuid) -> Vec<Uuid> {
        self.page_activities
            .iter()
            .filter(|(p, _)| *p == page_id)
            .map(|(_, a)| *a)
            .collect()
    }

    /// Clones a page row with its associations attached
    fn load(&self, page: &Page, with_followers: bool, with_owner: bool) -> Page {
        let mut page = page.clone();

        let mut images: Vec<Image> = self
            .images
            .values()
            .filter(|i| i.page_id == page.id)
            .cloned()
            .collect();
        images.sort_by_key(|i| i.position);
        page.images = images;

        let mut activities: Vec<Activity> = self
            .linked_activity_ids(page.id)
            .iter()
            .filter_map(|id| self.activities.get(id).cloned())
            .collect();
        activities.sort_by(|a, b| a.name.cmp(&b.name));
        page.activities = activities;

        if with_followers {
            page.followers = Some(
                self.page_followers
                    .iter()
                    .filter(|(p, _)| *p == page.id)
                    .filter_map(|(_, profile_id)| self.profiles.get(profile_id).cloned())
                    .collect(),
            );
        }

        if with_owner {
            page.owner = self.profiles.get(&page.owner_id).cloned();
        }

        page
    }
}

/// [`Repository`] held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an activity to the catalogue
    pub async fn add_activity(&self, name: &str) -> Result<Activity, StoreError> {
        let mut state = self.state.write().await;

        if state.activities.values().any(|a| a.name == name) {
            return Err(StoreError::Conflict(format!("activity '{}' already exists", name)));
        }

        let activity = Activity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.activities.insert(activity.id, activity.clone());

        Ok(activity)
    }

    /// Records that a profile follows a page
    pub async fn follow_page(&self, page_id: Uuid, profile_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if !state.pages.contains_key(&page_id) || !state.profiles.contains_key(&profile_id) {
            return Err(StoreError::Constraint("unknown page or profile".to_string()));
        }
        if !state.page_followers.contains(&(page_id, profile_id)) {
            state.page_followers.push((page_id, profile_id));
        }

        Ok(())
    }

    /// Number of live session rows
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Number of page rows
    pub async fn page_count(&self) -> usize {
        self.state.read().await.pages.len()
    }

    /// Shifts a session's expiry, for exercising expiry paths
    pub async fn set_session_expiry(
        &self,
        token_hash: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let session = state.sessions.get_mut(token_hash).ok_or(StoreError::NotFound)?;
        session.expires_at = expires_at;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create_user_with_profile(&self, data: CreateUser) -> Result<(User, Profile), StoreError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint \"users_email_key\": {}",
                data.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            id: Uuid::new_v4(),
            owner_id: user.id,
            username: None,
            first_name: None,
            last_name: None,
            gender: None,
            city: None,
            country: None,
            phone: None,
            created_at: now,
            updated_at: now,
        };

        state.users.insert(user.id, user.clone());
        state.profiles.insert(profile.id, profile.clone());

        Ok((user, profile))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ProfileRepository for MemoryRepository {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.read().await.profiles.get(&id).cloned())
    }

    async fn find_profile_by_owner(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let state = self.state.read().await;
        Ok(state.profiles.values().find(|p| p.owner_id == user_id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: UpdateProfile,
    ) -> Result<Option<Profile>, StoreError> {
        let mut state = self.state.write().await;

        Ok(state.profiles.get_mut(&id).map(|profile| {
            changes.apply_to(profile);
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }
}

#[async_trait]
impl SessionRepository for MemoryRepository {
    async fn insert_session(&self, data: CreateSession) -> Result<Session, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&data.owner_id) {
            return Err(StoreError::Constraint(format!("user {} does not exist", data.owner_id)));
        }
        if state.sessions.contains_key(&data.token_hash) {
            return Err(StoreError::Conflict("session token already exists".to_string()));
        }

        let session = Session {
            id: Uuid::new_v4(),
            token_hash: data.token_hash,
            owner_id: data.owner_id,
            created_at: Utc::now(),
            expires_at: data.expires_at,
        };
        state.sessions.insert(session.token_hash.clone(), session.clone());

        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.state.read().await.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(self.state.write().await.sessions.remove(token_hash).is_some())
    }
}

#[async_trait]
impl PageRepository for MemoryRepository {
    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError> {
        let state = self.state.read().await;

        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| filter.matches(p))
            .map(|p| state.load(p, filter.with_followers, filter.with_owner))
            .collect();
        pages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(pages)
    }

    async fn find_page(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        let state = self.state.read().await;
        Ok(state.pages.get(&id).map(|p| state.load(p, false, false)))
    }

    async fn insert_page(&self, data: NewPage) -> Result<Page, StoreError> {
        let mut state = self.state.write().await;

        if !state.profiles.contains_key(&data.owner_id) {
            return Err(StoreError::Constraint(format!(
                "profile {} does not exist",
                data.owner_id
            )));
        }
        if data.couch_number < 0 {
            return Err(StoreError::Constraint("couch_number must be >= 0".to_string()));
        }
        state.ensure_activities_exist(&data.activity_ids)?;

        let now = Utc::now();
        let page = Page {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            name: data.name,
            description: data.description,
            lat: data.lat,
            lng: data.lng,
            couch_number: data.couch_number,
            public: false,
            created_at: now,
            updated_at: now,
            new: false,
            images: Vec::new(),
            activities: Vec::new(),
            followers: None,
            owner: None,
        };

        state.pages.insert(page.id, page.clone());
        state.insert_images(page.id, &data.images);
        state.link_activities(page.id, &data.activity_ids);

        Ok(state.load(&page, false, false))
    }

    async fn update_page(&self, id: Uuid, changes: PageChanges) -> Result<Option<Page>, StoreError> {
        let mut state = self.state.write().await;

        if !state.pages.contains_key(&id) {
            return Ok(None);
        }

        // Validate everything before the first write so a failure leaves no trace
        if let Some(ids) = &changes.activity_ids {
            state.ensure_activities_exist(ids)?;
        }
        if changes.couch_number.is_some_and(|n| n < 0) {
            return Err(StoreError::Constraint("couch_number must be >= 0".to_string()));
        }

        if let Some(images) = &changes.images {
            state.images.retain(|_, image| image.page_id != id);
            state.insert_images(id, images);
        }

        if let Some(submitted) = &changes.activity_ids {
            let diff = ActivityDiff::compute(&state.linked_activity_ids(id), submitted);
            state
                .page_activities
                .retain(|(page_id, activity_id)| *page_id != id || !diff.remove.contains(activity_id));
            state.link_activities(id, &diff.add);
        }

        let Some(page) = state.pages.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            page.name = name;
        }
        if let Some(description) = changes.description {
            page.description = description;
        }
        if let Some(lat) = changes.lat {
            page.lat = Some(lat);
        }
        if let Some(lng) = changes.lng {
            page.lng = Some(lng);
        }
        if let Some(couch_number) = changes.couch_number {
            page.couch_number = couch_number;
        }
        page.updated_at = Utc::now();

        let page = page.clone();
        Ok(Some(state.load(&page, false, false)))
    }

    async fn delete_page(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        if state.pages.remove(&id).is_none() {
            return Ok(false);
        }
        state.images.retain(|_, image| image.page_id != id);
        state.page_activities.retain(|(page_id, _)| *page_id != id);
        state.page_followers.retain(|(page_id, _)| *page_id != id);

        Ok(true)
    }

    async fn set_page_public(&self, id: Uuid, public: bool) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        Ok(match state.pages.get_mut(&id) {
            Some(page) => {
                page.public = public;
                page.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<Image>, StoreError> {
        Ok(self.state.read().await.images.get(&id).cloned())
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.write().await.images.remove(&id).is_some())
    }

    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError> {
        let state = self.state.read().await;

        let mut activities: Vec<Activity> = state.activities.values().cloned().collect();
        activities.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(activities)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryRepository, Profile) {
        let repo = MemoryRepository::new();
        let (_, profile) = repo
            .create_user_with_profile(CreateUser {
                email: "owner@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("create user");
        (repo, profile)
    }

    fn new_page(owner_id: Uuid, activity_ids: Vec<Uuid>) -> NewPage {
        NewPage {
            owner_id,
            name: "Biarritz".to_string(),
            description: "Surf spot".to_string(),
            lat: Some(43.48),
            lng: Some(-1.55),
            couch_number: 1,
            images: vec![
                NewImage { url: "/uploads/a.png".to_string() },
                NewImage { url: "/uploads/b.png".to_string() },
            ],
            activity_ids,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (repo, _) = seeded().await;

        let result = repo
            .create_user_with_profile(CreateUser {
                email: "owner@example.com".to_string(),
                password_hash: "other".to_string(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_insert_page_keeps_image_order() {
        let (repo, profile) = seeded().await;

        let page = repo.insert_page(new_page(profile.id, vec![])).await.expect("insert");

        let urls: Vec<&str> = page.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["/uploads/a.png", "/uploads/b.png"]);
        assert!(!page.public);
    }

    #[tokio::test]
    async fn test_insert_page_with_unknown_activity_persists_nothing() {
        let (repo, profile) = seeded().await;

        let result = repo.insert_page(new_page(profile.id, vec![Uuid::new_v4()])).await;

        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert_eq!(repo.page_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_diffs_activities_and_replaces_images() {
        let (repo, profile) = seeded().await;
        let a1 = repo.add_activity("surf").await.expect("activity");
        let a2 = repo.add_activity("kite").await.expect("activity");
        let a3 = repo.add_activity("hike").await.expect("activity");
        let a4 = repo.add_activity("climb").await.expect("activity");

        let page = repo
            .insert_page(new_page(profile.id, vec![a1.id, a2.id, a3.id]))
            .await
            .expect("insert");

        let updated = repo
            .update_page(
                page.id,
                PageChanges {
                    images: Some(vec![NewImage { url: "/uploads/c.png".to_string() }]),
                    activity_ids: Some(vec![a2.id, a3.id, a4.id]),
                    ..Default::default()
                },
            )
            .await
            .expect("update")
            .expect("page exists");

        let mut ids: Vec<Uuid> = updated.activities.iter().map(|a| a.id).collect();
        ids.sort();
        let mut expected = vec![a2.id, a3.id, a4.id];
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(updated.images.len(), 1);
        assert_eq!(updated.images[0].url, "/uploads/c.png");
        assert_eq!(updated.name, "Biarritz");
    }

    #[tokio::test]
    async fn test_update_missing_page_returns_none() {
        let (repo, _) = seeded().await;

        let result = repo
            .update_page(Uuid::new_v4(), PageChanges::default())
            .await
            .expect("update");

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_page_cascades_images() {
        let (repo, profile) = seeded().await;
        let page = repo.insert_page(new_page(profile.id, vec![])).await.expect("insert");
        let image_id = page.images[0].id;

        assert!(repo.delete_page(page.id).await.expect("delete"));
        assert!(!repo.delete_page(page.id).await.expect("second delete"));
        assert!(repo.find_image(image_id).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn test_list_pages_loads_followers_and_owner_on_demand() {
        let (repo, profile) = seeded().await;
        let page = repo.insert_page(new_page(profile.id, vec![])).await.expect("insert");
        repo.follow_page(page.id, profile.id).await.expect("follow");

        let plain = repo.list_pages(&PageFilter::default()).await.expect("list");
        assert!(plain[0].followers.is_none());
        assert!(plain[0].owner.is_none());

        let full = repo
            .list_pages(&PageFilter {
                with_followers: true,
                with_owner: true,
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(full[0].followers.as_ref().map(Vec::len), Some(1));
        assert_eq!(full[0].owner.as_ref().map(|o| o.id), Some(profile.id));
    }
}

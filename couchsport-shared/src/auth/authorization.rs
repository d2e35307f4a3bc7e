/// Ownership checks
///
/// Pages are owned by profiles, profiles by users. Every check therefore
/// resolves the session's user id to its profile id first, then compares it
/// with the resource's owner.
///
/// The `own_*` functions answer the question and leave the decision to the
/// caller: `Ok(false)` means "authenticated but not owner", while an error
/// means ownership could not be verified at all (unknown profile or page).
/// Callers must treat errors as "not owner" and never mutate on them.
///
/// # Example
///
/// ```no_run
/// use couchsport_shared::auth::authorization::{own_page, AuthzError};
/// use couchsport_shared::db::repository::Repository;
/// use uuid::Uuid;
///
/// async fn guard(repo: &dyn Repository, user_id: Uuid, page_id: Uuid) -> Result<(), AuthzError> {
///     if !own_page(repo, user_id, page_id).await? {
///         return Err(AuthzError::NotAuthorized);
///     }
///     Ok(())
/// }
/// ```

use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::repository::Repository;

/// Error type for ownership checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The user has no profile
    #[error("No profile found for user {0}")]
    ProfileNotFound(Uuid),

    /// The page to check does not exist
    #[error("Page {0} not found")]
    PageNotFound(Uuid),

    /// The image to check does not exist
    #[error("Image {0} not found")]
    ImageNotFound(Uuid),

    /// The user doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// Storage failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Resolves a user id to the id of the profile it owns
///
/// # Errors
///
/// Returns `AuthzError::ProfileNotFound` if the user has no profile
pub async fn get_profile_id(repo: &dyn Repository, user_id: Uuid) -> Result<Uuid, AuthzError> {
    repo.find_profile_by_owner(user_id)
        .await?
        .map(|profile| profile.id)
        .ok_or(AuthzError::ProfileNotFound(user_id))
}

/// True iff the page's owner is the profile of `user_id`
///
/// # Errors
///
/// - `AuthzError::ProfileNotFound` if the user has no profile
/// - `AuthzError::PageNotFound` if the page does not exist
pub async fn own_page(repo: &dyn Repository, user_id: Uuid, page_id: Uuid) -> Result<bool, AuthzError> {
    let profile_id = get_profile_id(repo, user_id).await?;

    let page = repo
        .find_page(page_id)
        .await?
        .ok_or(AuthzError::PageNotFound(page_id))?;

    Ok(page.owner_id == profile_id)
}

/// True iff `profile_id` is the profile of `user_id`
///
/// # Errors
///
/// Returns `AuthzError::ProfileNotFound` if the user has no profile
pub async fn own_profile(repo: &dyn Repository, user_id: Uuid, profile_id: Uuid) -> Result<bool, AuthzError> {
    Ok(get_profile_id(repo, user_id).await? == profile_id)
}

/// Fails with `AuthzError::NotAuthorized` unless the user owns the page
pub async fn require_page_owner(
    repo: &dyn Repository,
    user_id: Uuid,
    page_id: Uuid,
) -> Result<(), AuthzError> {
    if own_page(repo, user_id, page_id).await? {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Fails with `AuthzError::NotAuthorized` unless the user owns the profile
pub async fn require_profile_owner(
    repo: &dyn Repository,
    user_id: Uuid,
    profile_id: Uuid,
) -> Result<(), AuthzError> {
    if own_profile(repo, user_id, profile_id).await? {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRepository;
    use crate::db::repository::{PageRepository, UserRepository};
    use crate::models::page::NewPage;
    use crate::models::profile::Profile;
    use crate::models::user::CreateUser;

    async fn user(repo: &MemoryRepository, email: &str) -> (Uuid, Profile) {
        let (user, profile) = repo
            .create_user_with_profile(CreateUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("create user");
        (user.id, profile)
    }

    async fn page_for(repo: &MemoryRepository, owner: &Profile) -> Uuid {
        repo.insert_page(NewPage {
            owner_id: owner.id,
            name: "Spot".to_string(),
            description: String::new(),
            lat: None,
            lng: None,
            couch_number: 0,
            images: vec![],
            activity_ids: vec![],
        })
        .await
        .expect("insert page")
        .id
    }

    #[tokio::test]
    async fn test_get_profile_id() {
        let repo = MemoryRepository::new();
        let (user_id, profile) = user(&repo, "a@example.com").await;

        assert_eq!(get_profile_id(&repo, user_id).await.expect("profile"), profile.id);
        assert!(matches!(
            get_profile_id(&repo, Uuid::new_v4()).await,
            Err(AuthzError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_own_page() {
        let repo = MemoryRepository::new();
        let (owner_id, owner_profile) = user(&repo, "owner@example.com").await;
        let (other_id, _) = user(&repo, "other@example.com").await;
        let page_id = page_for(&repo, &owner_profile).await;

        assert!(own_page(&repo, owner_id, page_id).await.expect("owner check"));
        assert!(!own_page(&repo, other_id, page_id).await.expect("other check"));
    }

    #[tokio::test]
    async fn test_own_page_unknown_page_is_an_error() {
        let repo = MemoryRepository::new();
        let (owner_id, _) = user(&repo, "owner@example.com").await;

        let result = own_page(&repo, owner_id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AuthzError::PageNotFound(_))));
    }

    #[tokio::test]
    async fn test_own_profile() {
        let repo = MemoryRepository::new();
        let (user_id, profile) = user(&repo, "a@example.com").await;
        let (_, other_profile) = user(&repo, "b@example.com").await;

        assert!(own_profile(&repo, user_id, profile.id).await.expect("own"));
        assert!(!own_profile(&repo, user_id, other_profile.id).await.expect("other"));
    }

    #[tokio::test]
    async fn test_require_page_owner() {
        let repo = MemoryRepository::new();
        let (owner_id, owner_profile) = user(&repo, "owner@example.com").await;
        let (other_id, _) = user(&repo, "other@example.com").await;
        let page_id = page_for(&repo, &owner_profile).await;

        assert!(require_page_owner(&repo, owner_id, page_id).await.is_ok());
        assert!(matches!(
            require_page_owner(&repo, other_id, page_id).await,
            Err(AuthzError::NotAuthorized)
        ));
    }
}

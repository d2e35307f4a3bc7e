/// Profile model and database operations
///
/// Each user owns exactly one profile, created in the same transaction as
/// the user. Pages reference the profile id as their owner, which is why
/// ownership checks always resolve user → profile first.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     username VARCHAR(100),
///     first_name VARCHAR(100),
///     last_name VARCHAR(100),
///     gender VARCHAR(20),
///     city VARCHAR(100),
///     country VARCHAR(100),
///     phone VARCHAR(40),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

const PROFILE_COLUMNS: &str = "id, owner_id, username, first_name, last_name, gender, city, \
                               country, phone, created_at, updated_at";

/// User-facing profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Unique profile ID
    pub id: Uuid,

    /// Owning user; immutable
    pub owner_id: Uuid,

    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a profile owner may change
///
/// Only `Some` fields are written. `owner_id` is deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(max = 100))]
    pub username: Option<String>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,

    #[validate(length(max = 20))]
    pub gender: Option<String>,

    #[validate(length(max = 100))]
    pub city: Option<String>,

    #[validate(length(max = 100))]
    pub country: Option<String>,

    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

/// Request body of a profile update: the target id plus the changes
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfilePayload {
    pub id: Uuid,

    #[serde(flatten)]
    #[validate(nested)]
    pub changes: UpdateProfile,
}

impl UpdateProfile {
    /// Returns true when no field would be written
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.gender.is_none()
            && self.city.is_none()
            && self.country.is_none()
            && self.phone.is_none()
    }

    /// Applies the present fields onto `profile`
    pub fn apply_to(&self, profile: &mut Profile) {
        let fields = [
            (&self.username, &mut profile.username),
            (&self.first_name, &mut profile.first_name),
            (&self.last_name, &mut profile.last_name),
            (&self.gender, &mut profile.gender),
            (&self.city, &mut profile.city),
            (&self.country, &mut profile.country),
            (&self.phone, &mut profile.phone),
        ];

        for (new, current) in fields {
            if let Some(value) = new {
                *current = Some(value.clone());
            }
        }
    }
}

impl Profile {
    /// Creates the (empty) profile of a freshly signed-up user
    pub async fn create_for_owner<'e, E>(executor: E, owner_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO profiles (owner_id) VALUES ($1) RETURNING {}",
            PROFILE_COLUMNS
        );

        sqlx::query_as::<_, Profile>(&query)
            .bind(owner_id)
            .fetch_one(executor)
            .await
    }

    /// Finds a profile by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds the profile owned by a user
    pub async fn find_by_owner<'e, E>(executor: E, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM profiles WHERE owner_id = $1", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&query)
            .bind(owner_id)
            .fetch_optional(executor)
            .await
    }

    /// Loads several profiles at once
    pub async fn find_many<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM profiles WHERE id = ANY($1)", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&query)
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// Updates a profile
    ///
    /// Only non-None fields in `data` are written. `updated_at` is always
    /// bumped.
    ///
    /// # Returns
    ///
    /// The updated profile, or None if it doesn't exist
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE profiles SET updated_at = NOW()");
        let mut bind_count = 1;

        let columns = [
            ("username", &data.username),
            ("first_name", &data.first_name),
            ("last_name", &data.last_name),
            ("gender", &data.gender),
            ("city", &data.city),
            ("country", &data.country),
            ("phone", &data.phone),
        ];

        for (column, value) in &columns {
            if value.is_some() {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", PROFILE_COLUMNS));

        let mut q = sqlx::query_as::<_, Profile>(&query).bind(id);
        for (_, value) in columns {
            if let Some(value) = value {
                q = q.bind(value.clone());
            }
        }

        q.fetch_optional(executor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            username: Some("old".to_string()),
            first_name: None,
            last_name: None,
            gender: None,
            city: Some("Lyon".to_string()),
            country: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_to_only_touches_present_fields() {
        let mut profile = empty_profile();
        let changes = UpdateProfile {
            username: Some("surfer".to_string()),
            country: Some("France".to_string()),
            ..Default::default()
        };

        changes.apply_to(&mut profile);

        assert_eq!(profile.username.as_deref(), Some("surfer"));
        assert_eq!(profile.country.as_deref(), Some("France"));
        assert_eq!(profile.city.as_deref(), Some("Lyon"));
        assert!(profile.phone.is_none());
    }

    #[test]
    fn test_update_profile_is_empty() {
        assert!(UpdateProfile::default().is_empty());
        assert!(!UpdateProfile {
            phone: Some("0600000000".to_string()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_profile_payload_flattens_changes() {
        let id = Uuid::new_v4();
        let payload: ProfilePayload = serde_json::from_value(serde_json::json!({
            "id": id,
            "username": "kiter",
            "city": "Brest"
        }))
        .expect("payload should deserialize");

        assert_eq!(payload.id, id);
        assert_eq!(payload.changes.username.as_deref(), Some("kiter"));
        assert_eq!(payload.changes.city.as_deref(), Some("Brest"));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_profile_payload_rejects_long_gender() {
        let payload = ProfilePayload {
            id: Uuid::new_v4(),
            changes: UpdateProfile {
                gender: Some("x".repeat(21)),
                ..Default::default()
            },
        };

        assert!(payload.validate().is_err());
    }
}

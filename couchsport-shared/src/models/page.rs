/// Page model and database operations
///
/// A page is the aggregate root of this service: a named place owned by a
/// profile, with an ordered image gallery and a set of activity tags. The
/// row itself only holds scalar fields; associations are loaded by the
/// repository and attached through the `#[sqlx(skip)]` fields.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE pages (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES profiles(id) ON DELETE RESTRICT,
///     name VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     lat DOUBLE PRECISION,
///     lng DOUBLE PRECISION,
///     couch_number INTEGER NOT NULL DEFAULT 0 CHECK (couch_number >= 0),
///     public BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use super::activity::{Activity, ActivityRef};
use super::image::{Image, ImagePayload, NewImage};
use super::profile::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

const PAGE_COLUMNS: &str = "id, owner_id, name, description, lat, lng, couch_number, public, \
                            created_at, updated_at";

/// Page aggregate
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: Uuid,

    /// Owning profile (not user); immutable after creation
    pub owner_id: Uuid,

    pub name: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub couch_number: i32,

    /// Whether the page is published
    pub public: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set only on the value returned by creation
    #[sqlx(skip)]
    #[serde(default)]
    pub new: bool,

    /// Gallery, ordered by position
    #[sqlx(skip)]
    #[serde(default)]
    pub images: Vec<Image>,

    #[sqlx(skip)]
    #[serde(default)]
    pub activities: Vec<Activity>,

    /// Loaded on demand (`followers` query key)
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<Profile>>,

    /// Loaded on demand (`profile` query key)
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Profile>,
}

/// Request body for page creation and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PagePayload {
    /// Required on update, ignored on create
    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,

    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0, message = "couch_number cannot be negative"))]
    pub couch_number: Option<i32>,

    /// Non-empty on update replaces the whole gallery
    #[serde(default)]
    pub images: Vec<ImagePayload>,

    /// On update the page's activities become exactly these; a missing
    /// list unlinks them all
    #[serde(default)]
    pub activities: Vec<ActivityRef>,
}

impl PagePayload {
    /// Activity ids carried by the payload
    pub fn activity_ids(&self) -> Vec<Uuid> {
        self.activities.iter().map(|a| a.id).collect()
    }
}

/// Row and associations to insert for a new page
#[derive(Debug, Clone)]
pub struct NewPage {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub couch_number: i32,
    pub images: Vec<NewImage>,
    pub activity_ids: Vec<Uuid>,
}

/// Changes applied by a page update
///
/// Scalars are only written when `Some`. `images` replaces the gallery
/// wholesale; `activity_ids` is diffed against the current links. `public`
/// is never touched here (see publish).
#[derive(Debug, Clone, Default)]
pub struct PageChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub couch_number: Option<i32>,
    pub images: Option<Vec<NewImage>>,
    pub activity_ids: Option<Vec<Uuid>>,
}

/// Rejected query parameter
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid value for '{key}': {value}")]
pub struct FilterError {
    pub key: String,
    pub value: String,
}

/// Listing filter built from query parameters
///
/// `id` and `owner_id` combine with AND; `followers` and `profile` only
/// switch on eager loading. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFilter {
    pub id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub with_followers: bool,
    pub with_owner: bool,
}

impl PageFilter {
    /// Filter for a single owner's pages
    pub fn by_owner(owner_id: Uuid) -> Self {
        PageFilter {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    /// Parses `?id=..&owner_id=..&followers&profile`
    ///
    /// # Errors
    ///
    /// Returns `FilterError` when `id` or `owner_id` is not a UUID
    ///
    /// # Example
    ///
    /// ```
    /// use couchsport_shared::models::page::PageFilter;
    /// use std::collections::HashMap;
    ///
    /// let mut query = HashMap::new();
    /// query.insert("profile".to_string(), String::new());
    /// query.insert("sort".to_string(), "name".to_string());
    ///
    /// let filter = PageFilter::from_query(&query).unwrap();
    /// assert!(filter.with_owner);
    /// assert!(filter.id.is_none());
    /// ```
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, FilterError> {
        let mut filter = PageFilter::default();

        for (key, value) in query {
            match key.as_str() {
                "id" => filter.id = Some(parse_uuid(key, value)?),
                "owner_id" => filter.owner_id = Some(parse_uuid(key, value)?),
                "followers" => filter.with_followers = true,
                "profile" => filter.with_owner = true,
                _ => {}
            }
        }

        Ok(filter)
    }

    /// Whether a page passes the id / owner filters
    pub fn matches(&self, page: &Page) -> bool {
        self.id.map_or(true, |id| page.id == id)
            && self.owner_id.map_or(true, |owner| page.owner_id == owner)
    }
}

fn parse_uuid(key: &str, value: &str) -> Result<Uuid, FilterError> {
    Uuid::parse_str(value.trim()).map_err(|_| FilterError {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Row of the `page_followers` join table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowerRow {
    pub page_id: Uuid,
    pub profile_id: Uuid,
}

impl Page {
    /// Inserts the page row (associations are inserted separately)
    pub async fn insert<'e, E>(executor: E, data: &NewPage) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO pages (owner_id, name, description, lat, lng, couch_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PAGE_COLUMNS
        );

        sqlx::query_as::<_, Page>(&query)
            .bind(data.owner_id)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.lat)
            .bind(data.lng)
            .bind(data.couch_number)
            .fetch_one(executor)
            .await
    }

    /// Finds a page row by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM pages WHERE id = $1", PAGE_COLUMNS);

        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Locks a page row for the rest of the transaction
    pub async fn lock<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM pages WHERE id = $1 FOR UPDATE", PAGE_COLUMNS);

        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists page rows matching the id / owner filters
    pub async fn list<'e, E>(executor: E, filter: &PageFilter) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = format!("SELECT {} FROM pages WHERE TRUE", PAGE_COLUMNS);
        let mut bind_count = 0;

        if filter.id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND id = ${}", bind_count));
        }

        if filter.owner_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND owner_id = ${}", bind_count));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, Page>(&query);
        if let Some(id) = filter.id {
            q = q.bind(id);
        }
        if let Some(owner_id) = filter.owner_id {
            q = q.bind(owner_id);
        }

        q.fetch_all(executor).await
    }

    /// Updates scalar fields
    ///
    /// Only non-None fields in `changes` are written; `updated_at` is
    /// always bumped.
    pub async fn update_fields<'e, E>(
        executor: E,
        id: Uuid,
        changes: &PageChanges,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE pages SET updated_at = NOW()");
        let mut bind_count = 1;

        if changes.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }

        if changes.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        if changes.lat.is_some() {
            bind_count += 1;
            query.push_str(&format!(", lat = ${}", bind_count));
        }

        if changes.lng.is_some() {
            bind_count += 1;
            query.push_str(&format!(", lng = ${}", bind_count));
        }

        if changes.couch_number.is_some() {
            bind_count += 1;
            query.push_str(&format!(", couch_number = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", PAGE_COLUMNS));

        let mut q = sqlx::query_as::<_, Page>(&query).bind(id);

        if let Some(name) = &changes.name {
            q = q.bind(name);
        }
        if let Some(description) = &changes.description {
            q = q.bind(description);
        }
        if let Some(lat) = changes.lat {
            q = q.bind(lat);
        }
        if let Some(lng) = changes.lng {
            q = q.bind(lng);
        }
        if let Some(couch_number) = changes.couch_number {
            q = q.bind(couch_number);
        }

        q.fetch_optional(executor).await
    }

    /// Sets the `public` flag
    ///
    /// # Returns
    ///
    /// true if the page exists
    pub async fn set_public<'e, E>(executor: E, id: Uuid, public: bool) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE pages SET public = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(public)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-deletes a page; images and links cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Follower links of several pages
    pub async fn followers_for_pages<'e, E>(
        executor: E,
        page_ids: &[Uuid],
    ) -> Result<Vec<FollowerRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, FollowerRow>(
            r#"
            SELECT page_id, profile_id
            FROM page_followers
            WHERE page_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(page_ids)
        .fetch_all(executor)
        .await
    }

    /// Records that a profile follows a page
    pub async fn follow<'e, E>(executor: E, page_id: Uuid, profile_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO page_followers (page_id, profile_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(page_id)
        .bind(profile_id)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn page_owned_by(owner_id: Uuid) -> Page {
        Page {
            id: Uuid::new_v4(),
            owner_id,
            name: "Spot".to_string(),
            description: String::new(),
            lat: None,
            lng: None,
            couch_number: 0,
            public: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            new: false,
            images: Vec::new(),
            activities: Vec::new(),
            followers: None,
            owner: None,
        }
    }

    #[test]
    fn test_filter_parses_known_keys() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let (id_str, owner_str) = (id.to_string(), owner.to_string());
        let filter = PageFilter::from_query(&query(&[
            ("id", id_str.as_str()),
            ("owner_id", owner_str.as_str()),
            ("followers", "true"),
            ("profile", ""),
        ]))
        .expect("filter should parse");

        assert_eq!(filter.id, Some(id));
        assert_eq!(filter.owner_id, Some(owner));
        assert!(filter.with_followers);
        assert!(filter.with_owner);
    }

    #[test]
    fn test_filter_ignores_unknown_keys() {
        let filter = PageFilter::from_query(&query(&[("limit", "10"), ("lang", "fr")]))
            .expect("unknown keys should be ignored");

        assert_eq!(filter, PageFilter::default());
    }

    #[test]
    fn test_filter_rejects_malformed_id() {
        let err = PageFilter::from_query(&query(&[("id", "42")])).unwrap_err();
        assert_eq!(err.key, "id");
        assert_eq!(err.value, "42");
    }

    #[test]
    fn test_filter_matches_combines_with_and() {
        let owner = Uuid::new_v4();
        let page = page_owned_by(owner);

        let both = PageFilter {
            id: Some(page.id),
            owner_id: Some(owner),
            ..Default::default()
        };
        assert!(both.matches(&page));

        let wrong_owner = PageFilter {
            id: Some(page.id),
            owner_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!wrong_owner.matches(&page));

        assert!(PageFilter::default().matches(&page));
    }

    #[test]
    fn test_payload_validation() {
        let valid = PagePayload {
            name: "Hossegor".to_string(),
            couch_number: Some(2),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let unnamed = PagePayload::default();
        assert!(unnamed.validate().is_err());

        let negative = PagePayload {
            name: "Hossegor".to_string(),
            couch_number: Some(-1),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let long_description = PagePayload {
            name: "Hossegor".to_string(),
            description: Some("a".repeat(2001)),
            ..Default::default()
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_payload_activity_ids() {
        let a = Uuid::new_v4();
        let payload: PagePayload = serde_json::from_value(serde_json::json!({
            "name": "Spot",
            "activities": [{"id": a}]
        }))
        .expect("payload should deserialize");

        assert_eq!(payload.activity_ids(), vec![a]);
        assert!(PagePayload::default().activity_ids().is_empty());
    }

    #[test]
    fn test_page_serializes_without_unloaded_associations() {
        let page = page_owned_by(Uuid::new_v4());
        let json = serde_json::to_value(&page).expect("serialize page");

        assert!(json.get("followers").is_none());
        assert!(json.get("owner").is_none());
        assert_eq!(json["new"], false);
        assert!(json["images"].as_array().is_some());
    }
}

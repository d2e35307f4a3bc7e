/// Activity catalogue and page ↔ activity links
///
/// Activities are tag-like rows (`surf`, `climbing`, ...) linked to pages
/// through the `page_activities` join table. Page updates never replace the
/// links wholesale: [`ActivityDiff`] computes which links to drop and which
/// to add so untouched links keep their rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE page_activities (
///     page_id UUID NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
///     activity_id UUID NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
///     PRIMARY KEY (page_id, activity_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::collections::HashSet;
use uuid::Uuid;

/// Activity tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Activity row joined with the page it is linked to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PageActivityRow {
    pub page_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<PageActivityRow> for Activity {
    fn from(row: PageActivityRow) -> Self {
        Activity {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Reference to an activity inside a page payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityRef {
    pub id: Uuid,
}

/// Link changes needed to move a page from one activity set to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityDiff {
    /// Linked activities absent from the submission
    pub remove: Vec<Uuid>,

    /// Submitted activities not linked yet
    pub add: Vec<Uuid>,
}

impl ActivityDiff {
    /// Computes the diff between the linked and the submitted sets
    ///
    /// Duplicates in `submitted` collapse; order follows the inputs.
    ///
    /// # Example
    ///
    /// ```
    /// use couchsport_shared::models::activity::ActivityDiff;
    /// use uuid::Uuid;
    ///
    /// let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    /// let diff = ActivityDiff::compute(&[a, b], &[b, c]);
    /// assert_eq!(diff.remove, vec![a]);
    /// assert_eq!(diff.add, vec![c]);
    /// ```
    pub fn compute(existing: &[Uuid], submitted: &[Uuid]) -> Self {
        let existing_set: HashSet<Uuid> = existing.iter().copied().collect();
        let submitted_set: HashSet<Uuid> = submitted.iter().copied().collect();

        let remove = existing
            .iter()
            .copied()
            .filter(|id| !submitted_set.contains(id))
            .collect();

        let mut seen = HashSet::new();
        let add = submitted
            .iter()
            .copied()
            .filter(|id| !existing_set.contains(id) && seen.insert(*id))
            .collect();

        ActivityDiff { remove, add }
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

impl Activity {
    /// Inserts an activity into the catalogue
    pub async fn create<'e, E>(executor: E, name: &str) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Activity>(
            "INSERT INTO activities (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(executor)
        .await
    }

    /// Lists the catalogue ordered by name
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Activity>("SELECT id, name, created_at FROM activities ORDER BY name")
            .fetch_all(executor)
            .await
    }

    /// Loads the activities linked to each of `page_ids`
    pub async fn find_for_pages<'e, E>(
        executor: E,
        page_ids: &[Uuid],
    ) -> Result<Vec<PageActivityRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PageActivityRow>(
            r#"
            SELECT pa.page_id, a.id, a.name, a.created_at
            FROM page_activities pa
            JOIN activities a ON a.id = pa.activity_id
            WHERE pa.page_id = ANY($1)
            ORDER BY a.name
            "#,
        )
        .bind(page_ids)
        .fetch_all(executor)
        .await
    }

    /// Ids of the activities currently linked to a page
    pub async fn linked_ids<'e, E>(executor: E, page_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT activity_id FROM page_activities WHERE page_id = $1",
        )
        .bind(page_id)
        .fetch_all(executor)
        .await
    }

    /// Links activities to a page; existing links are left alone
    pub async fn link<'e, E>(executor: E, page_id: Uuid, activity_ids: &[Uuid]) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if activity_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO page_activities (page_id, activity_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(page_id)
        .bind(activity_ids)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Removes the given links from a page
    pub async fn unlink<'e, E>(executor: E, page_id: Uuid, activity_ids: &[Uuid]) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if activity_ids.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM page_activities WHERE page_id = $1 AND activity_id = ANY($2)")
            .bind(page_id)
            .bind(activity_ids)
            .execute(executor)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_removes_missing_and_adds_new() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let existing = [ids[0], ids[1], ids[2]];
        let submitted = [ids[1], ids[2], ids[3]];

        let diff = ActivityDiff::compute(&existing, &submitted);

        assert_eq!(diff.remove, vec![ids[0]]);
        assert_eq!(diff.add, vec![ids[3]]);
    }

    #[test]
    fn test_diff_same_sets_is_empty() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(ActivityDiff::compute(&[a, b], &[b, a]).is_empty());
    }

    #[test]
    fn test_diff_empty_submission_removes_everything() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let diff = ActivityDiff::compute(&[a, b], &[]);
        assert_eq!(diff.remove, vec![a, b]);
        assert!(diff.add.is_empty());
    }

    #[test]
    fn test_diff_collapses_duplicate_submissions() {
        let a = Uuid::new_v4();

        let diff = ActivityDiff::compute(&[], &[a, a, a]);
        assert_eq!(diff.add, vec![a]);
    }
}

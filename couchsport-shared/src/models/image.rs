/// Page image model and database operations
///
/// An image row only carries the stored reference (`url`). The inline
/// encoded payload a client submits lives on [`ImagePayload`] and never
/// reaches the database: ingestion turns it into a stored file and a url.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE images (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     page_id UUID NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
///     url VARCHAR(512) NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Stored page image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,

    /// Page the image belongs to (back-reference only)
    pub page_id: Uuid,

    /// Stored reference returned by the file store
    pub url: String,

    /// Rank inside the page, in submission order
    pub position: i32,

    pub created_at: DateTime<Utc>,
}

/// Image entry of a page payload
///
/// Either references an already stored image (`url`) or carries an inline
/// upload (`file`, a data URL or bare base64 string) with an optional
/// client-side `filename`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(default)]
    pub page_id: Option<Uuid>,

    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ImagePayload {
    /// Structural validity: an image needs a stored reference or an inline
    /// payload
    pub fn is_valid(&self) -> bool {
        !self.url.trim().is_empty() || self.has_inline_payload()
    }

    /// True when the entry still has to go through ingestion
    pub fn has_inline_payload(&self) -> bool {
        self.file.as_deref().is_some_and(|f| !f.trim().is_empty())
    }
}

/// Image row to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
}

impl Image {
    /// Finds an image by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Image>(
            "SELECT id, page_id, url, position, created_at FROM images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Loads the images of several pages, ordered by position
    pub async fn find_for_pages<'e, E>(executor: E, page_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Image>(
            r#"
            SELECT id, page_id, url, position, created_at
            FROM images
            WHERE page_id = ANY($1)
            ORDER BY page_id, position
            "#,
        )
        .bind(page_ids)
        .fetch_all(executor)
        .await
    }

    /// Inserts images for a page, numbering positions from zero
    pub async fn insert_many(
        conn: &mut sqlx::PgConnection,
        page_id: Uuid,
        images: &[NewImage],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut stored = Vec::with_capacity(images.len());

        for (position, image) in images.iter().enumerate() {
            let row = sqlx::query_as::<_, Image>(
                r#"
                INSERT INTO images (page_id, url, position)
                VALUES ($1, $2, $3)
                RETURNING id, page_id, url, position, created_at
                "#,
            )
            .bind(page_id)
            .bind(&image.url)
            .bind(position as i32)
            .fetch_one(&mut *conn)
            .await?;

            stored.push(row);
        }

        Ok(stored)
    }

    /// Removes every image of a page
    pub async fn delete_for_page<'e, E>(executor: E, page_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM images WHERE page_id = $1")
            .bind(page_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a single image
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

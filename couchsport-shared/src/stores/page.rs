//! Page aggregate store
//!
//! Owns the page lifecycle: listing, creation, update, publication and
//! deletion, plus orchestration of image ingestion. Ownership is not
//! checked here; handlers run the [`authorization`](crate::auth::authorization)
//! checks before calling any mutating operation.
//!
//! Image files are written before the database transaction starts. When the
//! transaction then fails, the files stay on disk: they are orphans, and a
//! retried submission stores fresh copies.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::repository::Repository;
use crate::images::classify::classify;
use crate::images::decode::decode;
use crate::images::policy::{admit_images, page_directory};
use crate::images::storage::FileStore;
use crate::images::IngestError;
use crate::models::image::{ImagePayload, NewImage};
use crate::models::page::{NewPage, Page, PageChanges, PageFilter, PagePayload};

/// Error type for page operations
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// An image could not be ingested
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The page does not exist
    #[error("Page {0} not found")]
    NotFound(Uuid),

    /// The payload lacks the page id (update)
    #[error("Page id is required")]
    MissingId,
}

/// Page lifecycle operations
#[derive(Clone)]
pub struct PageStore {
    repo: Arc<dyn Repository>,
    files: Arc<dyn FileStore>,
}

impl PageStore {
    pub fn new(repo: Arc<dyn Repository>, files: Arc<dyn FileStore>) -> Self {
        Self { repo, files }
    }

    /// Lists pages; images and activities are always loaded
    pub async fn all(&self, filter: &PageFilter) -> Result<Vec<Page>, PageError> {
        Ok(self.repo.list_pages(filter).await?)
    }

    /// Pages owned by a profile
    pub async fn get_pages_by_owner_id(&self, profile_id: Uuid) -> Result<Vec<Page>, PageError> {
        Ok(self.repo.list_pages(&PageFilter::by_owner(profile_id)).await?)
    }

    /// Creates a page owned by `profile_id`
    ///
    /// Images are ingested under `page-<profile_id>` first; the page row,
    /// its images and its activity links are then inserted atomically. The
    /// returned page is the only value ever carrying `new = true`.
    ///
    /// # Errors
    ///
    /// - `PageError::Ingest` if any admitted image fails to decode, classify
    ///   or store; nothing is inserted
    /// - `PageError::Store` if the insert fails
    pub async fn create(&self, profile_id: Uuid, payload: PagePayload) -> Result<Page, PageError> {
        let activity_ids = payload.activity_ids();
        let images = self
            .ingest_images(&page_directory(profile_id), payload.images)
            .await?;

        let mut page = self
            .repo
            .insert_page(NewPage {
                owner_id: profile_id,
                name: payload.name,
                description: payload.description.unwrap_or_default(),
                lat: payload.lat,
                lng: payload.lng,
                couch_number: payload.couch_number.unwrap_or(0),
                images,
                activity_ids,
            })
            .await?;

        page.new = true;
        info!(page_id = %page.id, owner_id = %profile_id, "Page created");
        Ok(page)
    }

    /// Updates an existing page
    ///
    /// A non-empty image list replaces the gallery wholesale, re-ingesting
    /// inline payloads under the directory of the page's owner. The activity
    /// list, empty when omitted, is diffed against the current links. Scalars are
    /// overwritten when present; `public` and `owner_id` are untouched.
    ///
    /// # Errors
    ///
    /// - `PageError::MissingId` if the payload carries no id
    /// - `PageError::NotFound` if the page does not exist
    /// - `PageError::Ingest` / `PageError::Store` as for creation
    pub async fn update(&self, user_id: Uuid, payload: PagePayload) -> Result<Page, PageError> {
        let page_id = payload.id.ok_or(PageError::MissingId)?;

        let existing = self
            .repo
            .find_page(page_id)
            .await?
            .ok_or(PageError::NotFound(page_id))?;

        let activity_ids = Some(payload.activity_ids());
        let images = if payload.images.is_empty() {
            None
        } else {
            let directory = page_directory(existing.owner_id);
            Some(self.ingest_images(&directory, payload.images).await?)
        };

        let changes = PageChanges {
            name: Some(payload.name),
            description: payload.description,
            lat: payload.lat,
            lng: payload.lng,
            couch_number: payload.couch_number,
            images,
            activity_ids,
        };

        let mut page = self
            .repo
            .update_page(page_id, changes)
            .await?
            .ok_or(PageError::NotFound(page_id))?;

        page.new = false;
        info!(page_id = %page.id, user_id = %user_id, "Page updated");
        Ok(page)
    }

    /// Hard-deletes a page
    ///
    /// # Returns
    ///
    /// true if the page existed
    pub async fn delete(&self, user_id: Uuid, page_id: Uuid) -> Result<bool, PageError> {
        let deleted = self.repo.delete_page(page_id).await?;
        info!(page_id = %page_id, user_id = %user_id, deleted, "Page delete requested");
        Ok(deleted)
    }

    /// Sets the `public` flag; publishing twice is harmless
    ///
    /// # Returns
    ///
    /// true if the page exists
    pub async fn publish(&self, user_id: Uuid, page_id: Uuid, public: bool) -> Result<bool, PageError> {
        let updated = self.repo.set_page_public(page_id, public).await?;
        info!(page_id = %page_id, user_id = %user_id, public, updated, "Page publication changed");
        Ok(updated)
    }

    /// Removes one image from its page; the stored file is kept
    pub async fn delete_image(&self, user_id: Uuid, image_id: Uuid) -> Result<bool, PageError> {
        let deleted = self.repo.delete_image(image_id).await?;
        info!(image_id = %image_id, user_id = %user_id, deleted, "Image delete requested");
        Ok(deleted)
    }

    /// Runs the admitted images through decode → classify → save
    ///
    /// Entries without an inline payload pass through with their stored
    /// reference. The first failure aborts the whole batch; files already
    /// written by this call are left in place.
    pub async fn ingest_images(
        &self,
        directory: &str,
        images: Vec<ImagePayload>,
    ) -> Result<Vec<NewImage>, IngestError> {
        let admitted = admit_images(images);
        let mut ingested = Vec::with_capacity(admitted.len());

        for image in admitted {
            let Some(encoded) = image.file.as_deref().filter(|f| !f.trim().is_empty()) else {
                ingested.push(NewImage { url: image.url });
                continue;
            };

            let typed = decode(encoded).and_then(classify).map_err(|e| {
                warn!(directory, error = %e, "Rejected image payload");
                e
            })?;

            let url = self
                .files
                .save(directory, image.filename.as_deref(), &typed)
                .await?;

            debug!(directory, url = %url, format = typed.format.mime_type(), "Ingested image");
            ingested.push(NewImage { url });
        }

        Ok(ingested)
    }
}

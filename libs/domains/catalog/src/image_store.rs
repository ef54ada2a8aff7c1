//! Image records linked to their owning product.

use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use crate::error::CatalogResult;
use crate::models::{EntityKind, Image, ImageDraft, InternalKey};
use crate::repository::{ImageRepository, SequenceAllocator};

pub struct ImageStore<R: ImageRepository> {
    repository: Arc<R>,
    sequences: Arc<dyn SequenceAllocator>,
}

impl<R: ImageRepository> ImageStore<R> {
    pub fn new(repository: Arc<R>, sequences: Arc<dyn SequenceAllocator>) -> Self {
        Self {
            repository,
            sequences,
        }
    }

    /// Give each draft the next image id, stamp the owner and stage the whole
    /// batch in the caller's session. Returned images keep the input order.
    #[instrument(skip(self, session, drafts), fields(count = drafts.len()))]
    pub async fn create_many(
        &self,
        session: &mut R::Session,
        drafts: Vec<ImageDraft>,
        owner: InternalKey,
    ) -> CatalogResult<Vec<Image>> {
        for draft in &drafts {
            draft.validate()?;
        }

        let mut images = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = self.sequences.next(EntityKind::Image).await?;
            images.push(Image {
                id,
                data: draft.data,
                mime_type: draft.mime_type,
                original_name: draft.original_name,
                product_key: owner,
            });
        }

        if !images.is_empty() {
            self.repository.insert_many(session, &images).await?;
        }

        info!(count = images.len(), "Images staged");
        Ok(images)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Image>> {
        self.repository.find_by_id(id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_owner(&self, owner: InternalKey) -> CatalogResult<Vec<Image>> {
        self.repository.find_by_owner(owner).await
    }

    #[instrument(skip(self, session))]
    pub async fn delete_by_owner(
        &self,
        session: &mut R::Session,
        owner: InternalKey,
    ) -> CatalogResult<u64> {
        self.repository.delete_by_owner(session, owner).await
    }
}

impl<R: ImageRepository> Clone for ImageStore<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            sequences: Arc::clone(&self.sequences),
        }
    }
}

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{ClientSession, Collection, Database};
use tracing::instrument;

use super::documents::ImageDocument;
use crate::error::CatalogResult;
use crate::models::{Image, InternalKey};
use crate::repository::ImageRepository;

/// Images in the `images` collection
#[derive(Clone)]
pub struct MongoImageRepository {
    collection: Collection<ImageDocument>,
}

impl MongoImageRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<ImageDocument>("images"),
        }
    }
}

#[async_trait]
impl ImageRepository for MongoImageRepository {
    type Session = ClientSession;

    #[instrument(skip(self, session, images), fields(count = images.len()))]
    async fn insert_many(&self, session: &mut ClientSession, images: &[Image]) -> CatalogResult<()> {
        let documents: Vec<ImageDocument> = images.iter().map(ImageDocument::from).collect();
        self.collection
            .insert_many(documents)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn delete_by_owner(
        &self,
        session: &mut ClientSession,
        owner: InternalKey,
    ) -> CatalogResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "productKey": owner.to_string() })
            .session(&mut *session)
            .await?;
        Ok(result.deleted_count)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Image>> {
        self.collection
            .find_one(doc! { "id": id })
            .await?
            .map(Image::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_owner(&self, owner: InternalKey) -> CatalogResult<Vec<Image>> {
        let documents: Vec<ImageDocument> = self
            .collection
            .find(doc! { "productKey": owner.to_string() })
            .sort(doc! { "id": 1 })
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(Image::try_from).collect()
    }
}

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::{ClientSession, Collection, Database};
use tracing::instrument;

use super::documents::ProductDocument;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{InternalKey, Product};
use crate::repository::ProductRepository;

/// Products in the `products` collection
#[derive(Clone)]
pub struct MongoProductRepository {
    collection: Collection<ProductDocument>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<ProductDocument>("products"),
        }
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    type Session = ClientSession;

    #[instrument(skip(self, session, product), fields(product_id = product.id))]
    async fn insert(&self, session: &mut ClientSession, product: &Product) -> CatalogResult<()> {
        self.collection
            .insert_one(ProductDocument::from(product))
            .session(&mut *session)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn set_image_ids(
        &self,
        session: &mut ClientSession,
        key: InternalKey,
        image_ids: &[i64],
    ) -> CatalogResult<()> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": key.to_string() },
                doc! { "$set": { "imageIds": image_ids.to_vec() } },
            )
            .session(&mut *session)
            .await?;

        if result.matched_count == 0 {
            return Err(CatalogError::storage(format!("no product with key {key}")));
        }
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn delete_by_id(&self, session: &mut ClientSession, id: i64) -> CatalogResult<u64> {
        let result = self
            .collection
            .delete_one(doc! { "id": id })
            .session(&mut *session)
            .await?;
        Ok(result.deleted_count)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Product>> {
        self.collection
            .find_one(doc! { "id": id })
            .await?
            .map(Product::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_key(&self, key: InternalKey) -> CatalogResult<Option<Product>> {
        self.collection
            .find_one(doc! { "_id": key.to_string() })
            .await?
            .map(Product::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> CatalogResult<Vec<Product>> {
        let documents: Vec<ProductDocument> = self
            .collection
            .find(doc! {})
            .sort(doc! { "id": 1 })
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn decrement_amount_if_available(
        &self,
        id: i64,
        decrement: i64,
    ) -> CatalogResult<Option<i64>> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "amount": { "$gte": decrement } },
                doc! { "$inc": { "amount": -decrement } },
            )
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated.map(|document| document.amount))
    }
}

//! Product records: validation, identity assignment and persistence.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::CatalogResult;
use crate::models::{EntityKind, InternalKey, Product, ProductDraft};
use crate::repository::{ProductRepository, SequenceAllocator};

pub struct ProductStore<R: ProductRepository> {
    repository: Arc<R>,
    sequences: Arc<dyn SequenceAllocator>,
}

impl<R: ProductRepository> ProductStore<R> {
    pub fn new(repository: Arc<R>, sequences: Arc<dyn SequenceAllocator>) -> Self {
        Self {
            repository,
            sequences,
        }
    }

    /// Validate `draft`, assign it the next product id and stage it in the
    /// caller's session. Validation runs before anything touches storage.
    #[instrument(skip(self, session, draft))]
    pub async fn create(
        &self,
        session: &mut R::Session,
        draft: ProductDraft,
    ) -> CatalogResult<Product> {
        let input = draft.validate()?;
        let id = self.sequences.next(EntityKind::Product).await?;

        let product = Product {
            id,
            internal_key: InternalKey::generate(),
            name: input.name,
            price: input.price,
            amount: input.amount,
            category_id: input.category_id,
            image_ids: Vec::new(),
        };
        self.repository.insert(session, &product).await?;

        info!(product_id = id, "Product staged");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Product>> {
        self.repository.find_by_id(id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_key(&self, key: InternalKey) -> CatalogResult<Option<Product>> {
        self.repository.find_by_key(key).await
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> CatalogResult<Vec<Product>> {
        self.repository.find_all().await
    }

    #[instrument(skip(self, session))]
    pub async fn delete_by_id(&self, session: &mut R::Session, id: i64) -> CatalogResult<u64> {
        self.repository.delete_by_id(session, id).await
    }

    /// Only the creation unit of work calls this, once the images are staged.
    #[instrument(skip(self, session))]
    pub async fn update_image_ids(
        &self,
        session: &mut R::Session,
        key: InternalKey,
        image_ids: &[i64],
    ) -> CatalogResult<()> {
        self.repository.set_image_ids(session, key, image_ids).await
    }
}

impl<R: ProductRepository> Clone for ProductStore<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            sequences: Arc::clone(&self.sequences),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::repository::{MockProductRepository, MockSequenceAllocator};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_create_assigns_sequential_id() {
        let mut sequences = MockSequenceAllocator::new();
        sequences
            .expect_next()
            .with(eq(EntityKind::Product))
            .times(1)
            .returning(|_| Ok(7));

        let mut repository = MockProductRepository::new();
        repository
            .expect_insert()
            .withf(|_, product| product.id == 7 && product.name == "widget")
            .times(1)
            .returning(|_, _| Ok(()));

        let store = ProductStore::new(Arc::new(repository), Arc::new(sequences));
        let product = store
            .create(&mut (), ProductDraft::new("  widget ", 0).with_price("2.50"))
            .await
            .unwrap();

        assert_eq!(product.id, 7);
        assert_eq!(product.price, 250);
        assert!(product.image_ids.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_draft_never_allocates_or_writes() {
        let mut sequences = MockSequenceAllocator::new();
        sequences.expect_next().never();
        let mut repository = MockProductRepository::new();
        repository.expect_insert().never();

        let store = ProductStore::new(Arc::new(repository), Arc::new(sequences));
        let result = store
            .create(&mut (), ProductDraft::new("widget", -1))
            .await;

        assert!(matches!(result, Err(CatalogError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_counter_stops_creation() {
        let mut sequences = MockSequenceAllocator::new();
        sequences
            .expect_next()
            .returning(|_| Err(CatalogError::storage("counter storage unreachable")));
        let mut repository = MockProductRepository::new();
        repository.expect_insert().never();

        let store = ProductStore::new(Arc::new(repository), Arc::new(sequences));
        let result = store.create(&mut (), ProductDraft::new("widget", 0)).await;

        assert!(matches!(result, Err(CatalogError::StorageUnavailable(_))));
    }
}

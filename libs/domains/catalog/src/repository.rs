use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::{EntityKind, Image, InternalKey, Product};

/// Issues monotonically increasing identities per entity kind.
///
/// The first call for a kind returns 0. Two concurrent calls never return the
/// same value, and values are never handed out twice, even when the unit of
/// work that consumed one is rolled back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    async fn next(&self, kind: EntityKind) -> CatalogResult<i64>;
}

/// Begins, commits and aborts storage sessions that group several writes.
///
/// Writes performed through a session become visible together on `commit`, or
/// not at all on `abort`. See [`crate::unit_of_work::run`] for the driver that
/// guarantees `abort` on every failing exit path.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: Send;

    async fn begin(&self) -> CatalogResult<Self::Session>;

    async fn commit(&self, session: &mut Self::Session) -> CatalogResult<()>;

    async fn abort(&self, session: &mut Self::Session) -> CatalogResult<()>;
}

/// Persistence for product records
#[cfg_attr(test, mockall::automock(type Session = ();))]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    type Session: Send;

    /// Stage a new product record in the session
    async fn insert(&self, session: &mut Self::Session, product: &Product) -> CatalogResult<()>;

    /// Replace the stored image-id list of a product
    async fn set_image_ids(
        &self,
        session: &mut Self::Session,
        key: InternalKey,
        image_ids: &[i64],
    ) -> CatalogResult<()>;

    /// Remove a product by sequential id, returning how many records went away
    async fn delete_by_id(&self, session: &mut Self::Session, id: i64) -> CatalogResult<u64>;

    async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Product>>;

    async fn find_by_key(&self, key: InternalKey) -> CatalogResult<Option<Product>>;

    /// All products in insertion order
    async fn find_all(&self) -> CatalogResult<Vec<Product>>;

    /// Subtract `decrement` from the stored amount in one atomic step, but only
    /// if the stored amount is still at least `decrement` at the moment of the
    /// write. Returns the new amount, or `None` when the condition did not hold
    /// (or the product no longer exists).
    async fn decrement_amount_if_available(
        &self,
        id: i64,
        decrement: i64,
    ) -> CatalogResult<Option<i64>>;
}

/// Persistence for image records
#[async_trait]
pub trait ImageRepository: Send + Sync {
    type Session: Send;

    async fn insert_many(&self, session: &mut Self::Session, images: &[Image])
    -> CatalogResult<()>;

    /// Remove every image owned by a product
    async fn delete_by_owner(
        &self,
        session: &mut Self::Session,
        owner: InternalKey,
    ) -> CatalogResult<u64>;

    async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Image>>;

    /// Images owned by a product, in id order
    async fn find_by_owner(&self, owner: InternalKey) -> CatalogResult<Vec<Image>>;
}

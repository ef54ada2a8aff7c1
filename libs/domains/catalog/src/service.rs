//! Catalog Service - the façade the transport layer calls

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::CatalogConfig;
use crate::error::CatalogResult;
use crate::image_store::ImageStore;
use crate::models::{Image, ImageDraft, ImageView, Product, ProductDraft, ProductView};
use crate::product_store::ProductStore;
use crate::repository::{ImageRepository, ProductRepository, SequenceAllocator, UnitOfWork};
use crate::stock::StockAdjuster;
use crate::unit_of_work;

/// Creates, reads, deletes and decrements catalog products.
///
/// Multi-record writes (a product with its images, a product deletion with its
/// images) run as one unit of work. Reads go straight to the stores.
pub struct CatalogService<U, P, I>
where
    U: UnitOfWork,
    P: ProductRepository<Session = U::Session>,
    I: ImageRepository<Session = U::Session>,
{
    unit_of_work: Arc<U>,
    products: ProductStore<P>,
    images: ImageStore<I>,
    stock: StockAdjuster<P>,
    config: CatalogConfig,
}

impl<U, P, I> CatalogService<U, P, I>
where
    U: UnitOfWork + 'static,
    P: ProductRepository<Session = U::Session> + 'static,
    I: ImageRepository<Session = U::Session> + 'static,
{
    pub fn new(
        unit_of_work: U,
        products: P,
        images: I,
        sequences: Arc<dyn SequenceAllocator>,
        config: CatalogConfig,
    ) -> Self {
        let products = Arc::new(products);
        Self {
            unit_of_work: Arc::new(unit_of_work),
            products: ProductStore::new(Arc::clone(&products), Arc::clone(&sequences)),
            images: ImageStore::new(Arc::new(images), sequences),
            stock: StockAdjuster::new(products, config.stock_update_attempts),
            config,
        }
    }

    /// Create a product together with its images, all or nothing.
    ///
    /// The product gets its id first, the images are then written with a
    /// reference to it, and finally the product's image-id list is filled in.
    /// Any failure rolls back every write and returns the triggering error.
    #[instrument(skip(self, draft, images), fields(image_count = images.as_ref().map_or(0, Vec::len)))]
    pub async fn add_product(
        &self,
        draft: ProductDraft,
        images: Option<Vec<ImageDraft>>,
    ) -> CatalogResult<ProductView> {
        let products = self.products.clone();
        let image_store = self.images.clone();

        let product = unit_of_work::run(
            self.unit_of_work.as_ref(),
            self.config.unit_of_work_timeout,
            move |session| {
                Box::pin(async move {
                    let mut product = products.create(session, draft).await?;

                    if let Some(drafts) = images {
                        let saved = image_store
                            .create_many(session, drafts, product.internal_key)
                            .await?;
                        let image_ids: Vec<i64> = saved.iter().map(|image| image.id).collect();
                        products
                            .update_image_ids(session, product.internal_key, &image_ids)
                            .await?;
                        product.image_ids = image_ids;
                    }

                    Ok(product)
                })
            },
        )
        .await?;

        info!(product_id = product.id, "Product created");
        Ok(ProductView::from(&product))
    }

    /// Product with sequential id `id`, or `None`
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> CatalogResult<Option<ProductView>> {
        match self.products.find_by_id(id).await? {
            Some(product) => Ok(Some(self.with_owned_images(product).await?)),
            None => Ok(None),
        }
    }

    /// Every product in insertion order; empty when the catalog is empty
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> CatalogResult<Vec<ProductView>> {
        let products = self.products.find_all().await?;
        let mut views = Vec::with_capacity(products.len());
        for product in products {
            views.push(self.with_owned_images(product).await?);
        }
        Ok(views)
    }

    /// Delete a product and the images it owns in one unit of work.
    ///
    /// Returns the number of products removed: `0` when none had this id.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> CatalogResult<u64> {
        let Some(product) = self.products.find_by_id(id).await? else {
            return Ok(0);
        };

        let products = self.products.clone();
        let image_store = self.images.clone();
        let owner = product.internal_key;

        let (deleted, images_deleted) = unit_of_work::run(
            self.unit_of_work.as_ref(),
            self.config.unit_of_work_timeout,
            move |session| {
                Box::pin(async move {
                    let images_deleted = image_store.delete_by_owner(session, owner).await?;
                    let deleted = products.delete_by_id(session, id).await?;
                    Ok((deleted, images_deleted))
                })
            },
        )
        .await?;

        if deleted > 0 {
            info!(product_id = id, images_deleted, "Product deleted");
        }
        Ok(deleted)
    }

    /// Decrease the stock of a product; `None` when the product does not exist
    #[instrument(skip(self))]
    pub async fn decrease_amount(&self, id: i64, decrement: i64) -> CatalogResult<Option<i64>> {
        self.stock.decrease_amount(id, decrement).await
    }

    /// Describe image `id`, resolving its owner to the product's sequential id
    #[instrument(skip(self))]
    pub async fn get_image(&self, id: i64) -> CatalogResult<Option<ImageView>> {
        let Some(image) = self.images.find_by_id(id).await? else {
            return Ok(None);
        };
        let owner = self.products.find_by_key(image.product_key).await?;

        Ok(Some(ImageView {
            id: image.id,
            mime_type: image.mime_type,
            original_name: image.original_name,
            product_id: owner.map(|product| product.id),
        }))
    }

    /// Image record including its bytes, for the streaming collaborator
    #[instrument(skip(self))]
    pub async fn get_image_data(&self, id: i64) -> CatalogResult<Option<Image>> {
        self.images.find_by_id(id).await
    }

    /// Join the product with the images that reference it
    async fn with_owned_images(&self, mut product: Product) -> CatalogResult<ProductView> {
        let owned = self.images.find_by_owner(product.internal_key).await?;
        if !owned.is_empty() {
            product.image_ids = owned.iter().map(|image| image.id).collect();
        }
        Ok(ProductView::from(&product))
    }
}

impl<U, P, I> Clone for CatalogService<U, P, I>
where
    U: UnitOfWork,
    P: ProductRepository<Session = U::Session>,
    I: ImageRepository<Session = U::Session>,
{
    fn clone(&self) -> Self {
        Self {
            unit_of_work: Arc::clone(&self.unit_of_work),
            products: self.products.clone(),
            images: self.images.clone(),
            stock: self.stock.clone(),
            config: self.config.clone(),
        }
    }
}

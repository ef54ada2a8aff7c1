//! In-memory storage engine for development and tests.
//!
//! Committed state sits behind a single `RwLock`, which stands in for the
//! storage engine's own atomic primitives: a counter increment, a conditional
//! stock update and a session commit each run under one write guard. Sessions
//! stage their writes and apply them all-or-nothing on commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{EntityKind, Image, InternalKey, Product};
use crate::repository::{ImageRepository, ProductRepository, SequenceAllocator, UnitOfWork};
use crate::service::CatalogService;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    counters: HashMap<EntityKind, i64>,
    /// Keyed by sequential id, so iteration follows insertion order
    products: BTreeMap<i64, Product>,
    images: BTreeMap<i64, Image>,
}

#[derive(Debug)]
enum PendingWrite {
    InsertProduct(Product),
    SetImageIds { key: InternalKey, image_ids: Vec<i64> },
    DeleteProduct(i64),
    InsertImages(Vec<Image>),
    /// `expected` is what the session reported to its caller
    DeleteImagesOf { owner: InternalKey, expected: u64 },
}

impl MemoryState {
    fn apply(&mut self, write: PendingWrite) -> CatalogResult<()> {
        match write {
            PendingWrite::InsertProduct(product) => {
                if self.products.contains_key(&product.id) {
                    return Err(CatalogError::storage(format!(
                        "duplicate product id {}",
                        product.id
                    )));
                }
                self.products.insert(product.id, product);
            }
            PendingWrite::SetImageIds { key, image_ids } => {
                let product = self
                    .products
                    .values_mut()
                    .find(|p| p.internal_key == key)
                    .ok_or_else(|| CatalogError::storage(format!("no product with key {key}")))?;
                product.image_ids = image_ids;
            }
            PendingWrite::DeleteProduct(id) => {
                if self.products.remove(&id).is_none() {
                    return Err(CatalogError::storage(format!(
                        "product {id} was deleted concurrently"
                    )));
                }
            }
            PendingWrite::InsertImages(images) => {
                for image in images {
                    if self.images.contains_key(&image.id) {
                        return Err(CatalogError::storage(format!(
                            "duplicate image id {}",
                            image.id
                        )));
                    }
                    self.images.insert(image.id, image);
                }
            }
            PendingWrite::DeleteImagesOf { owner, expected } => {
                let before = self.images.len();
                self.images.retain(|_, image| image.product_key != owner);
                let removed = (before - self.images.len()) as u64;
                if removed != expected {
                    return Err(CatalogError::storage(format!(
                        "images of {owner} changed concurrently: expected {expected}, found {removed}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Writes staged by one unit of work
#[derive(Debug, Default)]
pub struct MemorySession {
    writes: Vec<PendingWrite>,
}

impl MemorySession {
    fn deletes_product(&self, id: i64) -> bool {
        self.writes
            .iter()
            .any(|w| matches!(w, PendingWrite::DeleteProduct(deleted) if *deleted == id))
    }

    fn deletes_images_of(&self, owner: InternalKey) -> bool {
        self.writes
            .iter()
            .any(|w| {
                matches!(w, PendingWrite::DeleteImagesOf { owner: key, .. } if *key == owner)
            })
    }
}

/// Catalog storage held in process memory
///
/// Implements every store trait, so one value backs a whole [`CatalogService`].
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    state: Arc<RwLock<MemoryState>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Build a catalog service backed by this storage
    pub fn service(
        &self,
        config: CatalogConfig,
    ) -> CatalogService<MemoryCatalog, MemoryCatalog, MemoryCatalog> {
        CatalogService::new(
            self.clone(),
            self.clone(),
            self.clone(),
            Arc::new(self.clone()),
            config,
        )
    }

    /// Simulate the storage engine going away (`false`) or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    pub async fn image_count(&self) -> usize {
        self.state.read().await.images.len()
    }

    fn ensure_available(&self) -> CatalogResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CatalogError::storage("in-memory storage is offline"))
        }
    }
}

#[async_trait]
impl SequenceAllocator for MemoryCatalog {
    async fn next(&self, kind: EntityKind) -> CatalogResult<i64> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let counter = state.counters.entry(kind).or_insert(0);
        let value = *counter;
        *counter += 1;
        Ok(value)
    }
}

#[async_trait]
impl UnitOfWork for MemoryCatalog {
    type Session = MemorySession;

    async fn begin(&self) -> CatalogResult<MemorySession> {
        self.ensure_available()?;
        Ok(MemorySession::default())
    }

    async fn commit(&self, session: &mut MemorySession) -> CatalogResult<()> {
        self.ensure_available()?;
        let writes = std::mem::take(&mut session.writes);

        let mut state = self.state.write().await;
        let mut next = MemoryState {
            counters: HashMap::new(),
            products: state.products.clone(),
            images: state.images.clone(),
        };
        for write in writes {
            next.apply(write)?;
        }
        state.products = next.products;
        state.images = next.images;
        Ok(())
    }

    async fn abort(&self, session: &mut MemorySession) -> CatalogResult<()> {
        session.writes.clear();
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryCatalog {
    type Session = MemorySession;

    async fn insert(&self, session: &mut MemorySession, product: &Product) -> CatalogResult<()> {
        self.ensure_available()?;
        session
            .writes
            .push(PendingWrite::InsertProduct(product.clone()));
        Ok(())
    }

    async fn set_image_ids(
        &self,
        session: &mut MemorySession,
        key: InternalKey,
        image_ids: &[i64],
    ) -> CatalogResult<()> {
        self.ensure_available()?;
        session.writes.push(PendingWrite::SetImageIds {
            key,
            image_ids: image_ids.to_vec(),
        });
        Ok(())
    }

    async fn delete_by_id(&self, session: &mut MemorySession, id: i64) -> CatalogResult<u64> {
        self.ensure_available()?;
        let exists = self.state.read().await.products.contains_key(&id);
        if !exists || session.deletes_product(id) {
            return Ok(0);
        }
        session.writes.push(PendingWrite::DeleteProduct(id));
        Ok(1)
    }

    async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Product>> {
        self.ensure_available()?;
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn find_by_key(&self, key: InternalKey) -> CatalogResult<Option<Product>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .find(|p| p.internal_key == key)
            .cloned())
    }

    async fn find_all(&self) -> CatalogResult<Vec<Product>> {
        self.ensure_available()?;
        Ok(self.state.read().await.products.values().cloned().collect())
    }

    async fn decrement_amount_if_available(
        &self,
        id: i64,
        decrement: i64,
    ) -> CatalogResult<Option<i64>> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) if product.amount >= decrement => {
                product.amount -= decrement;
                Ok(Some(product.amount))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ImageRepository for MemoryCatalog {
    type Session = MemorySession;

    async fn insert_many(&self, session: &mut MemorySession, images: &[Image]) -> CatalogResult<()> {
        self.ensure_available()?;
        session
            .writes
            .push(PendingWrite::InsertImages(images.to_vec()));
        Ok(())
    }

    async fn delete_by_owner(
        &self,
        session: &mut MemorySession,
        owner: InternalKey,
    ) -> CatalogResult<u64> {
        self.ensure_available()?;
        if session.deletes_images_of(owner) {
            return Ok(0);
        }
        let count = self
            .state
            .read()
            .await
            .images
            .values()
            .filter(|image| image.product_key == owner)
            .count() as u64;
        session.writes.push(PendingWrite::DeleteImagesOf {
            owner,
            expected: count,
        });
        Ok(count)
    }

    async fn find_by_id(&self, id: i64) -> CatalogResult<Option<Image>> {
        self.ensure_available()?;
        Ok(self.state.read().await.images.get(&id).cloned())
    }

    async fn find_by_owner(&self, owner: InternalKey) -> CatalogResult<Vec<Image>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .images
            .values()
            .filter(|image| image.product_key == owner)
            .cloned()
            .collect())
    }
}

//! MongoDB-backed catalog storage
//!
//! Collections:
//! - `counters`: one sequence document per entity kind
//! - `products`: `_id` is the internal key, `id` the public sequential id
//! - `images`: linked to their product through `productKey`
//!
//! Multi-document writes run inside a client-session transaction, which needs a
//! replica set or sharded deployment.

mod documents;
mod images;
mod products;
mod sequence;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, ClientSession, Database, IndexModel};
use tracing::{info, instrument};

use core_config::mongodb::MongoConfig;

use crate::config::CatalogConfig;
use crate::error::CatalogResult;
use crate::repository::UnitOfWork;
use crate::service::CatalogService;

pub use images::MongoImageRepository;
pub use products::MongoProductRepository;
pub use sequence::MongoSequenceAllocator;

use documents::{ImageDocument, ProductDocument};

/// Multi-document transactions over a [`ClientSession`]
#[derive(Clone)]
pub struct MongoUnitOfWork {
    client: Client,
}

impl MongoUnitOfWork {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UnitOfWork for MongoUnitOfWork {
    type Session = ClientSession;

    async fn begin(&self) -> CatalogResult<ClientSession> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(session)
    }

    async fn commit(&self, session: &mut ClientSession) -> CatalogResult<()> {
        session.commit_transaction().await?;
        Ok(())
    }

    async fn abort(&self, session: &mut ClientSession) -> CatalogResult<()> {
        session.abort_transaction().await?;
        Ok(())
    }
}

pub type MongoCatalogService =
    CatalogService<MongoUnitOfWork, MongoProductRepository, MongoImageRepository>;

/// Connection to the catalog database
#[derive(Clone)]
pub struct MongoCatalog {
    client: Client,
    db: Database,
}

impl MongoCatalog {
    pub fn new(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self { client, db }
    }

    #[instrument(skip(config), fields(database = %config.database))]
    pub async fn connect(config: &MongoConfig) -> CatalogResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = config.app_name.clone();
        let client = Client::with_options(options)?;

        info!("Connected to MongoDB");
        Ok(Self::new(client, &config.database))
    }

    /// Create the unique `id` indexes and the image owner index.
    ///
    /// Also creates the collections, which must exist before the first
    /// transaction writes to them on older servers.
    #[instrument(skip(self))]
    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let unique_id = || {
            IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };

        self.db
            .collection::<ProductDocument>("products")
            .create_index(unique_id())
            .await?;

        self.db
            .collection::<ImageDocument>("images")
            .create_indexes(vec![
                unique_id(),
                IndexModel::builder()
                    .keys(doc! { "productKey": 1, "id": 1 })
                    .build(),
            ])
            .await?;

        info!("Catalog indexes initialized");
        Ok(())
    }

    pub fn sequences(&self) -> MongoSequenceAllocator {
        MongoSequenceAllocator::new(&self.db)
    }

    pub fn products(&self) -> MongoProductRepository {
        MongoProductRepository::new(&self.db)
    }

    pub fn images(&self) -> MongoImageRepository {
        MongoImageRepository::new(&self.db)
    }

    /// Build a catalog service backed by this database
    pub fn service(&self, config: CatalogConfig) -> MongoCatalogService {
        CatalogService::new(
            MongoUnitOfWork::new(self.client.clone()),
            self.products(),
            self.images(),
            Arc::new(self.sequences()),
            config,
        )
    }
}

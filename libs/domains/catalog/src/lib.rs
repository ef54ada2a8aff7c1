//! Catalog Domain
//!
//! Products with stock amounts, prices in minor units and attached images,
//! stored in MongoDB or in process memory.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ CatalogService │  ← Entry point, unit-of-work orchestration
//! └───────┬────────┘
//!         │
//! ┌───────▼────────┐
//! │     Stores     │  ← Validation, id allocation, stock adjustment
//! └───────┬────────┘
//!         │
//! ┌───────▼────────┐
//! │  Repositories  │  ← Data access (traits + MongoDB / in-memory)
//! └───────┬────────┘
//!         │
//! ┌───────▼────────┐
//! │     Models     │  ← Entities, drafts, views
//! └────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::{FromEnv, mongodb::MongoConfig};
//! use domain_catalog::{CatalogConfig, MongoCatalog, ProductDraft};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = MongoCatalog::connect(&MongoConfig::from_env()?).await?;
//! catalog.init_indexes().await?;
//!
//! let service = catalog.service(CatalogConfig::from_env()?);
//! let created = service
//!     .add_product(ProductDraft::new("Widget", 1).with_price("10.00"), None)
//!     .await?;
//! assert_eq!(created.price, "10.00");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod image_store;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod price;
pub mod product_store;
pub mod repository;
pub mod service;
pub mod stock;
pub mod unit_of_work;

// Re-export commonly used types
pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use memory::MemoryCatalog;
pub use models::{
    EntityKind, Image, ImageDraft, ImageView, InternalKey, Product, ProductDraft, ProductView,
};
pub use mongo::{MongoCatalog, MongoCatalogService};
pub use repository::{ImageRepository, ProductRepository, SequenceAllocator, UnitOfWork};
pub use service::CatalogService;

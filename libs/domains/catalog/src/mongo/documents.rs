//! BSON shapes of the catalog collections

use mongodb::bson::Binary;
use mongodb::bson::spec::BinarySubtype;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Image, InternalKey, Product};

/// One document per entity kind in the `counters` collection
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CounterDocument {
    #[serde(rename = "_id")]
    pub kind: String,
    pub seq: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductDocument {
    #[serde(rename = "_id")]
    pub key: String,
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub amount: i64,
    pub category_id: i64,
    #[serde(default)]
    pub image_ids: Vec<i64>,
}

/// `_id` is left to the server; images are addressed by `id`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageDocument {
    pub id: i64,
    pub data: Binary,
    pub mime_type: String,
    pub original_name: String,
    pub product_key: String,
}

impl From<&Product> for ProductDocument {
    fn from(product: &Product) -> Self {
        Self {
            key: product.internal_key.to_string(),
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            amount: product.amount,
            category_id: product.category_id,
            image_ids: product.image_ids.clone(),
        }
    }
}

impl TryFrom<ProductDocument> for Product {
    type Error = CatalogError;

    fn try_from(document: ProductDocument) -> CatalogResult<Self> {
        Ok(Self {
            id: document.id,
            internal_key: InternalKey::parse(&document.key)?,
            name: document.name,
            price: document.price,
            amount: document.amount,
            category_id: document.category_id,
            image_ids: document.image_ids,
        })
    }
}

impl From<&Image> for ImageDocument {
    fn from(image: &Image) -> Self {
        Self {
            id: image.id,
            data: Binary {
                subtype: BinarySubtype::Generic,
                bytes: image.data.clone(),
            },
            mime_type: image.mime_type.clone(),
            original_name: image.original_name.clone(),
            product_key: image.product_key.to_string(),
        }
    }
}

impl TryFrom<ImageDocument> for Image {
    type Error = CatalogError;

    fn try_from(document: ImageDocument) -> CatalogResult<Self> {
        Ok(Self {
            id: document.id,
            data: document.data.bytes,
            mime_type: document.mime_type,
            original_name: document.original_name,
            product_key: InternalKey::parse(&document.product_key)?,
        })
    }
}

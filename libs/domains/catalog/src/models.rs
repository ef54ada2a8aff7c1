use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;
use strum::{AsRefStr, Display};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::price;

/// Entity kinds that draw identities from their own sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Product,
    Image,
}

/// Storage-engine identity of a product, used only to link images.
///
/// Never leaves the catalog: everything external refers to the sequential id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternalKey(Uuid);

impl InternalKey {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(raw: &str) -> CatalogResult<Self> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| CatalogError::storage(format!("corrupt internal key '{raw}': {e}")))
    }
}

impl fmt::Display for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Product as held by the stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub internal_key: InternalKey,
    pub name: String,
    /// Price in minor units (cents)
    pub price: i64,
    pub amount: i64,
    pub category_id: i64,
    pub image_ids: Vec<i64>,
}

/// Image as held by the stores
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub id: i64,
    pub data: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
    pub product_key: InternalKey,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("mime_type", &self.mime_type)
            .field("original_name", &self.original_name)
            .field("product_key", &self.product_key)
            .finish()
    }
}

/// Unvalidated product input, as supplied by the transport layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: Option<String>,
    /// Decimal string, e.g. `"10.50"`. Defaults to zero.
    pub price: Option<String>,
    /// Stock count. Defaults to zero.
    pub amount: Option<Number>,
    pub category_id: Option<Number>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, category_id: i64) -> Self {
        Self {
            name: Some(name.into()),
            category_id: Some(Number::from(category_id)),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(Number::from(amount));
        self
    }

    /// Check every field constraint and normalise the input.
    pub fn validate(&self) -> CatalogResult<NewProduct> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| CatalogError::validation("name", "", "Name is required"))?
            .trim()
            .to_string();
        if name.is_empty() {
            return Err(CatalogError::validation("name", "", "Name cannot be empty"));
        }

        let price = match self.price.as_deref() {
            Some(raw) => price::to_minor_units(raw)?,
            None => 0,
        };

        let amount = match &self.amount {
            Some(value) => whole_number(
                "amount",
                value,
                "Amount cannot be negative",
                "The value must be an integer",
            )?,
            None => 0,
        };

        let category_id = match &self.category_id {
            Some(value) => whole_number(
                "categoryId",
                value,
                "Category ID cannot be negative",
                "The ID must be an integer",
            )?,
            None => {
                return Err(CatalogError::validation(
                    "categoryId",
                    "",
                    "Category ID is required",
                ));
            }
        };

        let product = NewProduct {
            name,
            price,
            amount,
            category_id,
        };
        product.validate()?;
        Ok(product)
    }
}

/// Product input that passed validation, prices already in minor units
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewProduct {
    #[validate(length(max = 255, message = "Name cannot be longer than 255 characters"))]
    pub name: String,
    pub price: i64,
    pub amount: i64,
    pub category_id: i64,
}

/// Largest float that still converts to i64 without saturating
const I64_FLOAT_LIMIT: f64 = 9_223_372_036_854_775_807.0;

fn whole_number(
    field: &str,
    value: &Number,
    negative_message: &str,
    fractional_message: &str,
) -> CatalogResult<i64> {
    if let Some(whole) = value.as_i64() {
        if whole < 0 {
            return Err(CatalogError::validation(
                field,
                value,
                format!("{negative_message}, got {value}"),
            ));
        }
        return Ok(whole);
    }

    let float = value.as_f64().unwrap_or(f64::INFINITY);
    if float < 0.0 {
        return Err(CatalogError::validation(
            field,
            value,
            format!("{negative_message}, got {value}"),
        ));
    }
    if float.fract() != 0.0 {
        return Err(CatalogError::validation(
            field,
            value,
            format!("{fractional_message}, got {value}"),
        ));
    }
    if float >= I64_FLOAT_LIMIT || value.is_u64() {
        return Err(CatalogError::validation(
            field,
            value,
            format!("The value is out of range, got {value}"),
        ));
    }
    Ok(float as i64)
}

/// Binary upload handed over by the upload collaborator
#[derive(Clone, Validate)]
pub struct ImageDraft {
    pub data: Vec<u8>,
    #[validate(length(min = 1, message = "Image MIME type is required"))]
    pub mime_type: String,
    pub original_name: String,
}

impl ImageDraft {
    pub fn new(
        data: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            original_name: original_name.into(),
        }
    }
}

impl fmt::Debug for ImageDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDraft")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("mime_type", &self.mime_type)
            .field("original_name", &self.original_name)
            .finish()
    }
}

/// External representation of a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    /// Two-decimal string, e.g. `"10.00"`
    pub price: String,
    pub amount: i64,
    pub category_id: i64,
    pub image_ids: Vec<i64>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: price::to_display(product.price),
            amount: product.amount,
            category_id: product.category_id,
            image_ids: product.image_ids.clone(),
        }
    }
}

/// External description of an image; the bytes are streamed separately
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: i64,
    pub mime_type: String,
    pub original_name: String,
    /// Sequential id of the owning product
    pub product_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_and_message(err: CatalogError) -> (String, String) {
        match err {
            CatalogError::Validation { field, message, .. } => (field, message),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn draft_with(amount: Option<Number>, category_id: Option<Number>) -> ProductDraft {
        ProductDraft {
            name: Some("product name".to_string()),
            price: None,
            amount,
            category_id,
        }
    }

    #[test]
    fn test_defaults_for_price_and_amount() {
        let product = ProductDraft::new("widget", 0).validate().unwrap();
        assert_eq!(product.price, 0);
        assert_eq!(product.amount, 0);
        assert_eq!(product.category_id, 0);
    }

    #[test]
    fn test_name_is_trimmed() {
        let product = ProductDraft::new("      product name   ", 0)
            .validate()
            .unwrap();
        assert_eq!(product.name, "product name");
    }

    #[test]
    fn test_name_required() {
        let draft = ProductDraft {
            name: None,
            ..ProductDraft::new("", 0)
        };
        let (field, message) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "name");
        assert!(message.contains("required"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let (field, _) = field_and_message(ProductDraft::new("   ", 0).validate().unwrap_err());
        assert_eq!(field, "name");
    }

    #[test]
    fn test_name_length_limit() {
        assert!(ProductDraft::new("a".repeat(255), 0).validate().is_ok());

        let (field, message) =
            field_and_message(ProductDraft::new("a".repeat(256), 0).validate().unwrap_err());
        assert_eq!(field, "name");
        assert!(message.contains("255"));
    }

    #[test]
    fn test_negative_amount() {
        let draft = draft_with(Some(Number::from(-1)), Some(Number::from(0)));
        let (field, message) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "amount");
        assert!(message.contains("negative"));
        assert!(message.contains("-1"));
    }

    #[test]
    fn test_fractional_amount() {
        let draft = draft_with(Number::from_f64(5.5), Some(Number::from(0)));
        let (field, message) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "amount");
        assert!(message.contains("integer"));
        assert!(message.contains("5.5"));
    }

    #[test]
    fn test_whole_float_amount_accepted() {
        let draft = draft_with(Number::from_f64(7.0), Some(Number::from(0)));
        assert_eq!(draft.validate().unwrap().amount, 7);
    }

    #[test]
    fn test_negative_category() {
        let draft = draft_with(Some(Number::from(1)), Some(Number::from(-1)));
        let (field, message) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "categoryId");
        assert!(message.contains("negative"));
    }

    #[test]
    fn test_fractional_category() {
        let draft = draft_with(Some(Number::from(1)), Number::from_f64(1.23));
        let (field, message) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "categoryId");
        assert!(message.contains("ID must be an integer"));
    }

    #[test]
    fn test_category_required() {
        let draft = draft_with(Some(Number::from(10)), None).with_price("10.00");
        let (field, _) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "categoryId");
    }

    #[test]
    fn test_amount_out_of_range() {
        let draft = draft_with(Some(Number::from(u64::MAX)), Some(Number::from(0)));
        let (field, message) = field_and_message(draft.validate().unwrap_err());
        assert_eq!(field, "amount");
        assert!(message.contains("out of range"));
    }

    #[test]
    fn test_draft_deserializes_from_camel_case() {
        let draft: ProductDraft = serde_json::from_str(
            r#"{"name":"widget","price":"10.001","amount":3,"categoryId":2}"#,
        )
        .unwrap();
        let product = draft.validate().unwrap();
        assert_eq!(product.price, 1000);
        assert_eq!(product.amount, 3);
        assert_eq!(product.category_id, 2);
    }

    #[test]
    fn test_view_hides_internal_key_and_formats_price() {
        let product = Product {
            id: 3,
            internal_key: InternalKey::generate(),
            name: "widget".to_string(),
            price: 1999,
            amount: 4,
            category_id: 1,
            image_ids: vec![0, 1],
        };
        let json = serde_json::to_value(ProductView::from(&product)).unwrap();
        assert_eq!(json["price"], "19.99");
        assert_eq!(json["categoryId"], 1);
        assert_eq!(json["imageIds"], serde_json::json!([0, 1]));
        assert!(json.get("internalKey").is_none());
    }

    #[test]
    fn test_image_draft_requires_mime_type() {
        let draft = ImageDraft::new(vec![1, 2, 3], "", "a.png");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_internal_key_parse_round_trip() {
        let key = InternalKey::generate();
        assert_eq!(InternalKey::parse(&key.to_string()).unwrap(), key);
        assert!(InternalKey::parse("not-a-key").is_err());
    }
}

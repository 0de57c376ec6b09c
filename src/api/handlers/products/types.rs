//! Product catalog records and the edit form payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::variants::split_variants;

/// Price for one pack size, in TZS.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PriceItem {
    pub size: String,
    pub amount: i64,
}

/// One row of the edit form: a size with both audience prices.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub size: String,
    #[serde(default)]
    pub farmer: i64,
    #[serde(default)]
    pub agrovet: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub category: String,
    pub img: Option<String>,
    pub measure: Option<String>,
    pub description: Option<String>,
    pub key_features: Option<Vec<String>>,
    pub usage_instructions: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub tags: Option<Vec<String>>,
    pub is_exclusive: bool,
    pub is_featured: bool,
    pub is_popular: bool,
    pub sales_count: i32,
    pub farmer_price: Vec<PriceItem>,
    pub agrovet_price: Vec<PriceItem>,
    /// `farmer_price` and `agrovet_price` merged for the edit form.
    pub variants: Vec<Variant>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProductsPage {
    pub products: Vec<Product>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub measure: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_exclusive: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// Validated form, ready to write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProductInput {
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) img: Option<String>,
    pub(crate) measure: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) is_exclusive: bool,
    pub(crate) is_featured: bool,
    pub(crate) is_popular: bool,
    pub(crate) farmer_price: Vec<PriceItem>,
    pub(crate) agrovet_price: Vec<PriceItem>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl ProductForm {
    /// # Errors
    /// Returns the message to show when the form is incomplete.
    pub(crate) fn validate(self) -> Result<ProductInput, &'static str> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Product name is required");
        }
        if self.variants.is_empty() {
            return Err("You must have at least one size variant.");
        }

        let variants: Vec<Variant> = self
            .variants
            .into_iter()
            .map(|variant| Variant {
                size: variant.size.trim().to_string(),
                ..variant
            })
            .collect();
        let (farmer_price, agrovet_price) = split_variants(&variants);

        Ok(ProductInput {
            name,
            category: self.category.trim().to_string(),
            img: non_blank(self.img),
            measure: non_blank(self.measure),
            description: non_blank(self.description),
            is_exclusive: self.is_exclusive,
            is_featured: self.is_featured,
            is_popular: self.is_popular,
            farmer_price,
            agrovet_price,
        })
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::models::ProductType;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub price: Decimal,
    pub brand: Option<String>,
    pub memory_amount: Option<i32>,
    pub type_id: i32,
    pub selectable_values: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    pub url: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub id: i32,
    pub product_id: i32,
    pub title: String,
    pub color_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShortInfoItem {
    pub id: i32,
    pub product_id: i32,
    pub title: String,
    pub icon: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfoItem {
    pub id: i32,
    pub product_id: i32,
    pub title: String,
    pub value: String,
}

/// How much of the product graph to load alongside the scalar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Product row and its type only.
    Scalars,
    /// Scalars plus the ordered image list.
    WithImages,
    /// The whole graph: images, color, short and additional info.
    Full,
}

/// Product with its loaded relations, shaped for detail responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub images: Vec<ProductImage>,
    pub color: Option<Color>,
    pub short_info: Vec<ShortInfoItem>,
    pub additional_info: Vec<AdditionalInfoItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListItem {
    pub id: i32,
    pub title: String,
    pub price: Decimal,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub data: Vec<ProductListItem>,
    pub total: i64,
}

/// Query parameters for the product listing. `brands` and
/// `memoryAmounts` accept comma-separated values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub type_id: Option<i32>,
    #[serde(default, deserialize_with = "comma_separated")]
    pub brands: Option<Vec<String>>,
    #[serde(default, deserialize_with = "comma_separated")]
    pub memory_amounts: Option<Vec<i32>>,
    pub price_from: Option<Decimal>,
    pub price_to: Option<Decimal>,
    pub items_per_page: Option<i64>,
    pub page: Option<i64>,
}

fn comma_separated<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut values = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        values.push(part.parse::<T>().map_err(serde::de::Error::custom)?);
    }

    Ok(if values.is_empty() { None } else { Some(values) })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInput {
    pub title: String,
    pub color_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortInfoInput {
    pub title: String,
    pub icon: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfoInput {
    pub title: String,
    pub value: String,
}

#[derive(Debug)]
pub struct CreateProductRequest {
    pub title: String,
    pub type_id: i32,
    pub price: Decimal,
    pub brand: Option<String>,
    pub memory_amount: Option<i32>,
    pub selectable_values: Option<Vec<String>>,
    pub color: Option<ColorInput>,
    pub short_info: Vec<ShortInfoInput>,
    pub additional_info: Vec<AdditionalInfoInput>,
}

/// Partial update of product scalars and nested collections. `None`
/// leaves the field untouched; nested collections are replaced as a
/// whole when present.
#[derive(Debug, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub type_id: Option<i32>,
    pub price: Option<Decimal>,
    pub brand: Option<String>,
    pub memory_amount: Option<i32>,
    pub selectable_values: Option<Vec<String>>,
    pub color: Option<ColorInput>,
    pub short_info: Option<Vec<ShortInfoInput>>,
    pub additional_info: Option<Vec<AdditionalInfoInput>>,
}

/// Explicit image-array patch, distinguishing "no new files" from
/// "clear the gallery".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePatch {
    /// Leave existing image rows untouched.
    Keep,
    /// Delete every existing image row, then insert this set in order.
    Replace(Vec<String>),
    /// Delete every existing image row without replacement.
    Clear,
}

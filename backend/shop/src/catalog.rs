//! # Catalog
//!
//! Static product list served in place of a database.
//!
//! ## Listing
//! - Search is a case-insensitive substring match over the name and subtitle
//! - Price bounds are inclusive
//! - Sorting is stable, so `Featured` keeps the catalog order
//! - `total_count` is the size of the filtered set, before pagination
//!
//! ## Detail
//! Every product has exactly one variant and one primary image. Variant ids
//! look like `variant-{id}-1` and skus like `SKU-{id}`.
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::price::Price;

pub const DEFAULT_PAGE_LIMIT: u32 = 24;
pub const MAX_PAGE_LIMIT: u32 = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: u32,
    pub title: String,
    pub subtitle: String,
    pub price: Price,
    pub image_src: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn variant_id(&self) -> String {
        format!("variant-{}-1", self.id)
    }

    pub fn sku(&self) -> String {
        format!("SKU-{}", self.id)
    }

    pub fn description(&self) -> String {
        format!(
            "This is a detailed description for {}. {}",
            self.title, self.subtitle
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl From<&str> for SortOrder {
    fn from(value: &str) -> Self {
        match value {
            "price_asc" => SortOrder::PriceAsc,
            "price_desc" => SortOrder::PriceDesc,
            "newest" => SortOrder::Newest,
            _ => SortOrder::Featured,
        }
    }
}

/// Raw listing filters, as they arrive in a query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilters {
    pub search: Option<String>,
    pub price_min: Option<Price>,
    pub price_max: Option<Price>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedFilters {
    pub search: Option<String>,
    pub price_min: Option<Price>,
    pub price_max: Option<Price>,
    pub sort: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl ProductFilters {
    pub fn normalized(&self) -> NormalizedFilters {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let (price_min, price_max) = match (self.price_min, self.price_max) {
            (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
            bounds => bounds,
        };

        NormalizedFilters {
            search,
            price_min,
            price_max,
            sort: self.sort.as_deref().map(SortOrder::from).unwrap_or_default(),
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub min_price: Price,
    pub max_price: Price,
    pub created_at: DateTime<Utc>,
    pub subtitle: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.title.clone(),
            image_url: product.image_src.clone(),
            min_price: product.price,
            max_price: product.price,
            created_at: product.created_at,
            subtitle: product.subtitle.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductSummary>,
    pub total_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gender {
    pub id: String,
    pub label: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub hex_code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Size {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub sort_order: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_published: bool,
    pub default_variant_id: String,
    pub created_at: DateTime<Utc>,
    pub brand: Brand,
    pub category: Category,
    pub gender: Gender,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub sku: String,
    pub price: Price,
    pub sale_price: Option<Price>,
    pub in_stock: bool,
    pub color: Color,
    pub size: Size,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: String,
    pub product_id: String,
    pub url: String,
    pub sort_order: u32,
    pub is_primary: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductDetail {
    pub product: ProductInfo,
    pub variants: Vec<Variant>,
    pub images: Vec<ProductImage>,
}

impl From<&Product> for ProductDetail {
    fn from(product: &Product) -> Self {
        let id = product.id.to_string();

        let variant = Variant {
            id: product.variant_id(),
            product_id: id.clone(),
            sku: product.sku(),
            price: product.price,
            sale_price: None,
            in_stock: true,
            color: Color {
                id: "color-1".to_string(),
                name: "Black".to_string(),
                slug: "black".to_string(),
                hex_code: "#000000".to_string(),
            },
            size: Size {
                id: "size-1".to_string(),
                name: "M".to_string(),
                slug: "m".to_string(),
                sort_order: 1,
            },
        };

        let image = ProductImage {
            id: format!("image-{id}-1"),
            product_id: id.clone(),
            url: product.image_src.clone(),
            sort_order: 0,
            is_primary: true,
        };

        Self {
            product: ProductInfo {
                id,
                name: product.title.clone(),
                description: product.description(),
                is_published: true,
                default_variant_id: variant.id.clone(),
                created_at: product.created_at,
                brand: Brand {
                    id: "brand-1".to_string(),
                    name: "Premium Brand".to_string(),
                    slug: "premium-brand".to_string(),
                },
                category: Category {
                    id: "category-1".to_string(),
                    name: "Footwear".to_string(),
                    slug: "footwear".to_string(),
                },
                gender: Gender {
                    id: "gender-1".to_string(),
                    label: "Unisex".to_string(),
                    slug: "unisex".to_string(),
                },
            },
            variants: vec![variant],
            images: vec![image],
        }
    }
}

pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Product> {
        let id: u32 = id.trim().parse().ok()?;

        self.products.iter().find(|product| product.id == id)
    }

    pub fn get_product(&self, id: &str) -> Option<ProductDetail> {
        self.find(id).map(ProductDetail::from)
    }

    pub fn list_products(&self, filters: &ProductFilters) -> ProductPage {
        let filters = filters.normalized();

        let mut matches: Vec<&Product> = self
            .products
            .iter()
            .filter(|product| matches_filters(product, &filters))
            .collect();

        match filters.sort {
            SortOrder::Featured => {}
            SortOrder::PriceAsc => matches.sort_by_key(|product| product.price),
            SortOrder::PriceDesc => matches.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOrder::Newest => matches.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        let total_count = matches.len();
        let start = (filters.page as usize - 1).saturating_mul(filters.limit as usize);

        let products = matches
            .into_iter()
            .skip(start)
            .take(filters.limit as usize)
            .map(ProductSummary::from)
            .collect();

        ProductPage {
            products,
            total_count,
        }
    }
}

fn matches_filters(product: &Product, filters: &NormalizedFilters) -> bool {
    if let Some(term) = &filters.search {
        let in_title = product.title.to_lowercase().contains(term);
        let in_subtitle = product.subtitle.to_lowercase().contains(term);

        if !in_title && !in_subtitle {
            return false;
        }
    }

    if filters.price_min.is_some_and(|min| product.price < min) {
        return false;
    }

    if filters.price_max.is_some_and(|max| product.price > max) {
        return false;
    }

    true
}

impl Default for Catalog {
    fn default() -> Self {
        // (title, subtitle, cents, days after the epoch the product was listed)
        const PRODUCTS: [(&str, &str, u64, i64); 8] = [
            ("Air Court Mid '07", "Men's Shoes", 9830, 20_100),
            ("Court Vision Low Next Nature", "Men's Shoes", 7699, 20_140),
            ("Air Cushion 90 SE", "Women's Shoes", 14000, 20_080),
            ("Dunk Low Retro", "Men's Shoes", 11500, 20_160),
            ("Pegasus Trail Runner", "Road Running Shoes", 13999, 20_120),
            ("Blazer Mid '77 Vintage", "Women's Shoes", 10500, 20_060),
            ("Jump Low", "Kids' Shoes", 8500, 20_150),
            ("Revolution 7", "Easy Running Shoes", 6999, 20_090),
        ];

        let products = PRODUCTS
            .iter()
            .zip(1u32..)
            .map(|(&(title, subtitle, cents, listed), id)| Product {
                id,
                title: title.to_string(),
                subtitle: subtitle.to_string(),
                price: Price::from_cents(cents),
                image_src: format!("/shoes/shoe-{id}.jpg"),
                created_at: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(listed),
            })
            .collect();

        Self::new(products)
    }
}

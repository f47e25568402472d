//! # Cart
//!
//! The cart lives entirely in a client cookie named `cart`.
//!
//! ## Cookie Format
//! - Percent-encoded JSON array of line items
//! - Each item: `{ id, name, price, quantity, image, description? }`, price in dollars
//! - Lasts 7 days, rewritten whole on every mutation
//!
//! Rows written by older clients carry `variantId`/`productId` instead of `id`. The row
//! id is `variantId` when present, else `id`, else `productId`.
//!
//! ## Reconciliation
//! - At most one row per id, adding an existing id bumps its quantity
//! - Rows keep the order they were first added in
//! - A cookie that fails to decode is an empty cart, never an error for the user
//! - Totals are recomputed from the rows each time they are asked for
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{catalog::Product, price::Price};

pub const CART_COOKIE: &str = "cart";
pub const CART_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;
pub const DELIVERY_FEE: Price = Price::from_cents(200);
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-image.jpg";

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Cart row has no id")]
    MissingId,

    #[error("Malformed cart cookie: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredLineItem")]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LineItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.title.clone(),
            price: product.price,
            quantity,
            image: product.image_src.clone(),
            description: Some(product.subtitle.clone()),
        }
    }

    pub fn sku(&self) -> String {
        format!("SKU-{}", self.id)
    }

    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLineItem {
    id: Option<String>,
    variant_id: Option<String>,
    product_id: Option<String>,
    name: String,
    price: Price,
    quantity: u32,
    image: Option<String>,
    description: Option<String>,
}

impl TryFrom<StoredLineItem> for LineItem {
    type Error = CartError;

    fn try_from(stored: StoredLineItem) -> Result<Self, Self::Error> {
        let id = stored
            .variant_id
            .or(stored.id)
            .or(stored.product_id)
            .filter(|id| !id.is_empty())
            .ok_or(CartError::MissingId)?;

        Ok(Self {
            id,
            name: stored.name,
            price: stored.price,
            quantity: stored.quantity,
            image: stored
                .image
                .filter(|image| !image.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            description: stored.description.filter(|d| !d.is_empty()),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub total_items: u64,
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a cart out of the raw cookie value, falling back to an empty cart.
    pub fn from_cookie(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::new();
        };

        Self::decode(value).unwrap_or_else(|e| {
            warn!("Discarding unreadable cart cookie: {e}");
            Self::new()
        })
    }

    pub fn decode(value: &str) -> Result<Self, CartError> {
        let json = urlencoding::decode(value)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| value.to_string());

        let rows: Vec<LineItem> = serde_json::from_str(&json)?;

        // Tampered cookies can repeat an id, fold them back into one row.
        let mut cart = Self::new();
        for row in rows {
            cart.add(row);
        }

        Ok(cart)
    }

    pub fn to_cookie_value(&self) -> Result<String, CartError> {
        let json = serde_json::to_string(&self.items)?;

        Ok(urlencoding::encode(&json).into_owned())
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn add(&mut self, item: LineItem) {
        if item.quantity == 0 {
            return;
        }

        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
    }

    pub fn add_product(&mut self, product: &Product, quantity: u32) {
        self.add(LineItem::from_product(product, quantity));
    }

    /// Returns false when no row has this id. A quantity of zero removes the row.
    pub fn set_quantity(&mut self, id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id);
        }

        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);

        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| item.quantity as u64).sum()
    }

    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    pub fn delivery_fee(&self) -> Price {
        DELIVERY_FEE
    }

    pub fn total(&self) -> Price {
        self.subtotal() + self.delivery_fee()
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            total_items: self.total_items(),
            subtotal: self.subtotal(),
            delivery_fee: self.delivery_fee(),
            total: self.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn item(id: &str, cents: u64, quantity: u32) -> LineItem {
        LineItem {
            id: id.to_string(),
            name: format!("Shoe {id}"),
            price: Price::from_cents(cents),
            quantity,
            image: format!("/shoes/{id}.jpg"),
            description: None,
        }
    }

    #[test]
    fn test_add_merges_same_id() {
        let mut cart = Cart::new();
        cart.add(item("1", 1000, 1));
        cart.add(item("2", 500, 2));
        cart.add(item("1", 1000, 3));

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].id, "1");
        assert_eq!(cart.items()[0].quantity, 4);
        assert_eq!(cart.items()[1].id, "2");
    }

    #[test]
    fn test_add_product_uses_subtitle_as_description() {
        let catalog = Catalog::default();
        let product = catalog.find("3").unwrap();

        let mut cart = Cart::new();
        cart.add_product(product, 1);
        cart.add_product(product, 1);

        let row = cart.get("3").unwrap();
        assert_eq!(row.quantity, 2);
        assert_eq!(row.description.as_deref(), Some("Women's Shoes"));
        assert_eq!(row.sku(), "SKU-3");
    }

    #[test]
    fn test_zero_quantity_add_is_ignored() {
        let mut cart = Cart::new();
        cart.add(item("1", 1000, 0));

        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        cart.add(item("1", 1000, 1));

        assert!(cart.set_quantity("1", 5));
        assert_eq!(cart.get("1").unwrap().quantity, 5);

        assert!(!cart.set_quantity("missing", 2));

        assert!(cart.set_quantity("1", 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(item("1", 1000, 1));
        cart.add(item("2", 1000, 1));

        assert!(cart.remove("1"));
        assert!(!cart.remove("1"));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_quantity_saturates() {
        let mut cart = Cart::new();
        cart.add(item("1", 100, u32::MAX));
        cart.add(item("1", 100, 10));

        assert_eq!(cart.get("1").unwrap().quantity, u32::MAX);
    }

    #[test]
    fn test_summary() {
        let mut cart = Cart::new();
        cart.add(item("1", 9830, 2));
        cart.add(item("2", 7699, 1));

        let summary = cart.summary();
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.subtotal, Price::from_cents(27359));
        assert_eq!(summary.delivery_fee, Price::from_cents(200));
        assert_eq!(summary.total, Price::from_cents(27559));
        assert_eq!(summary.total.to_string(), "$275.59");
    }

    #[test]
    fn test_cookie_survives_a_trip() {
        let mut cart = Cart::new();
        cart.add(item("1", 13999, 2));
        cart.add(LineItem {
            description: Some("Men's Shoes & more".to_string()),
            ..item("2", 500, 1)
        });

        let value = cart.to_cookie_value().unwrap();
        assert!(!value.contains('"'));
        assert!(!value.contains(' '));

        assert_eq!(Cart::from_cookie(Some(&value)), cart);
    }

    #[test]
    fn test_reads_unencoded_json() {
        let cart = Cart::from_cookie(Some(
            r#"[{"id":"7","name":"Jump Low","price":85,"quantity":2,"image":"/shoes/shoe-7.jpg"}]"#,
        ));

        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.subtotal(), Price::from_cents(17000));
    }

    #[test]
    fn test_reads_legacy_rows() {
        let cart = Cart::from_cookie(Some(
            r#"[{"variantId":"variant-4-1","productId":"4","name":"Dunk Low Retro","price":115,"quantity":1}]"#,
        ));

        let row = cart.get("variant-4-1").unwrap();
        assert_eq!(row.image, PLACEHOLDER_IMAGE);
        assert_eq!(row.description, None);
    }

    #[test]
    fn test_legacy_row_id_precedence() {
        let cart = Cart::from_cookie(Some(
            r#"[
                {"productId":"4","name":"Dunk Low Retro","price":115,"quantity":1},
                {"id":"5","variantId":"variant-5-2","productId":"5","name":"Blazer Mid '77","price":105,"quantity":2},
                {"id":"6","productId":"60","name":"Pegasus 41","price":140,"quantity":3}
            ]"#,
        ));

        let ids: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["4", "variant-5-2", "6"]);
        assert_eq!(cart.get("variant-5-2").unwrap().quantity, 2);
        assert!(cart.get("5").is_none());
    }

    #[test]
    fn test_duplicate_rows_are_folded() {
        let cart = Cart::from_cookie(Some(
            r#"[{"id":"1","name":"a","price":1,"quantity":1},{"id":"1","name":"a","price":1,"quantity":2}]"#,
        ));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_malformed_cookie_is_empty() {
        assert!(Cart::from_cookie(None).is_empty());
        assert!(Cart::from_cookie(Some("not json")).is_empty());
        assert!(Cart::from_cookie(Some("%7B%22broken")).is_empty());
        assert!(Cart::from_cookie(Some(r#"[{"name":"no id","price":1,"quantity":1}]"#)).is_empty());
        assert!(Cart::from_cookie(Some(r#"[{"id":"1","name":"a","price":1,"quantity":-2}]"#)).is_empty());
    }
}

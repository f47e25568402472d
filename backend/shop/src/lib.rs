//! # Shop
//!
//! Storefront domain logic, free of any HTTP concerns.
//!
//! - [`catalog`]: the static product list, filtering and pagination
//! - [`cart`]: cookie-backed cart reconciliation and totals
//! - [`payment`]: checkout form formatting and validation
//! - [`price`]: integer-cent money
pub mod cart;
pub mod catalog;
pub mod payment;
pub mod price;

pub use cart::{Cart, CartError, CartSummary, LineItem};
pub use catalog::{Catalog, Product, ProductDetail, ProductFilters, ProductPage};
pub use payment::{CardPreview, CardType, FieldErrors, PaymentForm, ValidatedPayment};
pub use price::Price;

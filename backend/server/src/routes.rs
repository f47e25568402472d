use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shop::{
    CardPreview, Cart, CartSummary, LineItem, PaymentForm, Price, ProductDetail, ProductFilters,
    ProductPage,
};
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    checkout::PaymentStatus,
    cookies::{cart_cookie, expired_cart_cookie, load_cart},
    error::AppError,
    state::State as AppState,
};

/// Navigation badge count, sent with every cart response.
pub const CART_COUNT_HEADER: HeaderName = HeaderName::from_static("x-cart-count");

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: LineItem,
    pub sku: String,
    pub line_total: Price,
}

#[derive(Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub summary: CartSummary,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let items = cart
            .items()
            .iter()
            .map(|item| CartLine {
                sku: item.sku(),
                line_total: item.line_total(),
                item: item.clone(),
            })
            .collect();

        Self {
            items,
            summary: cart.summary(),
        }
    }
}

fn count_header(cart: &Cart) -> (HeaderName, HeaderValue) {
    (CART_COUNT_HEADER, HeaderValue::from(cart.total_items()))
}

/// Rewrites the whole cart cookie and returns the new cart.
fn cart_response(state: &AppState, cart: &Cart) -> Result<Response, AppError> {
    let cookie = cart_cookie(&state.config, cart)?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie), count_header(cart)],
        Json(CartView::from(cart)),
    )
        .into_response())
}

pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProductFilters>, QueryRejection>,
) -> Result<Json<ProductPage>, AppError> {
    let Query(filters) = query.map_err(|_| AppError::MalformedPayload)?;

    Ok(Json(state.catalog.list_products(&filters)))
}

pub async fn product_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>, AppError> {
    state
        .catalog
        .get_product(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))
}

pub async fn cart_handler(headers: HeaderMap) -> impl IntoResponse {
    let cart = load_cart(&headers);

    ([count_header(&cart)], Json(CartView::from(&cart)))
}

pub async fn cart_count_handler(headers: HeaderMap) -> impl IntoResponse {
    let cart = load_cart(&headers);

    Json(json!({ "count": cart.total_items() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    product_id: String,
    quantity: Option<u32>,
}

pub async fn add_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AddItem>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;
    let quantity = payload.quantity.unwrap_or(1);

    if quantity == 0 {
        return Err(AppError::InvalidQuantity);
    }

    let product = state
        .catalog
        .find(&payload.product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {}", payload.product_id)))?;

    let mut cart = load_cart(&headers);
    cart.add_product(product, quantity);
    debug!("Added {quantity} x product {} to cart", product.id);

    cart_response(&state, &cart)
}

#[derive(Deserialize)]
pub struct UpdateQuantity {
    quantity: u32,
}

pub async fn update_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateQuantity>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    let mut cart = load_cart(&headers);
    if !cart.set_quantity(&id, payload.quantity) {
        return Err(AppError::NotFound(format!("Cart item {id}")));
    }
    debug!("Set quantity of {id} to {}", payload.quantity);

    cart_response(&state, &cart)
}

pub async fn remove_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&headers);
    if cart.remove(&id) {
        debug!("Removed {id} from cart");
    }

    cart_response(&state, &cart)
}

pub async fn clear_cart_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cart = Cart::new();

    (
        [
            (SET_COOKIE, expired_cart_cookie(&state.config)),
            count_header(&cart),
        ],
        Json(CartView::from(&cart)),
    )
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CardInput {
    card_number: String,
    expiry_date: String,
    cvv: String,
}

pub async fn format_payment_handler(
    payload: Result<Json<CardInput>, JsonRejection>,
) -> Result<Json<CardPreview>, AppError> {
    let Json(input) = payload.map_err(|_| AppError::MalformedPayload)?;

    Ok(Json(CardPreview::new(
        &input.card_number,
        &input.expiry_date,
        &input.cvv,
    )))
}

pub async fn submit_payment_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PaymentForm>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(form) = payload.map_err(|_| AppError::MalformedPayload)?;

    let cart = load_cart(&headers);
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let details = form.validate(Local::now().date_naive())?;

    info!("Submitting payment for {}", cart.summary().total);
    sleep(state.config.payment_submit_delay).await;

    let receipt = state.payments.submit(details, &cart.summary()).await;
    let location = HeaderValue::from_str(&format!("/payment/{}", receipt.id))?;

    Ok((StatusCode::ACCEPTED, [(LOCATION, location)], Json(receipt)).into_response())
}

pub async fn payment_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("Payment {id}"));

    let payment_id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let receipt = state
        .payments
        .status(payment_id)
        .await
        .ok_or_else(not_found)?;

    if receipt.status == PaymentStatus::Succeeded {
        let cart = Cart::new();

        return Ok((
            [
                (SET_COOKIE, expired_cart_cookie(&state.config)),
                count_header(&cart),
            ],
            Json(receipt),
        )
            .into_response());
    }

    Ok(Json(receipt).into_response())
}

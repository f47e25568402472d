//! # Cart Cookie
//!
//! The server never stores a cart. Each request brings the whole cart in the
//! `cart` cookie and each mutation sends the whole cart back in `Set-Cookie`.
//!
//! - `Path=/`, `HttpOnly`, `SameSite=Lax`, lasts 7 days
//! - `Secure` when `COOKIE_SECURE=true`
//! - Clearing expires the cookie with `Max-Age=0`
use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use shop::{
    Cart,
    cart::{CART_COOKIE, CART_MAX_AGE_SECS},
};
use tracing::warn;

use crate::{config::Config, error::AppError};

/// Browsers start dropping cookies past this size.
const MAX_COOKIE_BYTES: usize = 4096;

pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then_some(value.trim())
        })
}

pub fn load_cart(headers: &HeaderMap) -> Cart {
    Cart::from_cookie(read_cookie(headers, CART_COOKIE))
}

fn attributes(config: &Config, max_age: u64) -> String {
    let mut attributes = format!("Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");

    if config.cookie_secure {
        attributes.push_str("; Secure");
    }

    attributes
}

pub fn cart_cookie(config: &Config, cart: &Cart) -> Result<HeaderValue, AppError> {
    let value = cart.to_cookie_value()?;
    let cookie = format!(
        "{CART_COOKIE}={value}; {}",
        attributes(config, CART_MAX_AGE_SECS)
    );

    if cookie.len() > MAX_COOKIE_BYTES {
        warn!(
            "Cart cookie is {} bytes, clients may drop it",
            cookie.len()
        );
    }

    Ok(HeaderValue::from_str(&cookie)?)
}

pub fn expired_cart_cookie(config: &Config) -> HeaderValue {
    let cookie = format!(
        "{CART_COOKIE}=; {}; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        attributes(config, 0)
    );

    // Only ASCII goes into this string.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("cart=; Max-Age=0"))
}

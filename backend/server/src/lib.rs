//! Documentation of a small storefront backend.
//!
//! Products come from a static list, the cart rides along in a cookie and
//! checkout is mocked end to end.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server directly, JSON in and JSON out
//! - No database, the only server-side state is the in-memory payment registry
//! - Every cart mutation reads the `cart` cookie, changes it in memory and rewrites the whole cookie
//! - A restart loses pending payments but never carts
//!
//!
//!
//! # Cart Badge
//!
//! **Goal**: Keep the navigation badge in sync without a shared event bus.
//!
//! - Every cart response carries the new item count in `X-Cart-Count`
//! - Pages that did not make the change can poll `GET /cart/count`
//! - A succeeded payment also sends `X-Cart-Count: 0` along with the expired cookie
//!
//!
//!
//! # Routes
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET | `/products` | search, price bounds, sort, pagination |
//! | GET | `/products/{id}` | product detail |
//! | GET | `/cart` | items and summary |
//! | DELETE | `/cart` | clear |
//! | GET | `/cart/count` | badge count |
//! | POST | `/cart/items` | add `{ productId, quantity? }` |
//! | PUT | `/cart/items/{id}` | set `{ quantity }`, 0 removes |
//! | DELETE | `/cart/items/{id}` | remove |
//! | POST | `/payment/format` | live card input formatting |
//! | POST | `/payment` | submit checkout form |
//! | GET | `/payment/{id}` | payment status |
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run the server with logs.
//! ```sh
//! RUST_LOG=info cargo run -p storefront
//! ```
//!
//! Smoke test a running server.
//! ```sh
//! cargo run -p tester -- --base-url http://localhost:1111
//! ```
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{CONTENT_TYPE, LOCATION},
    },
    routing::{get, post, put},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod checkout;
pub mod config;
pub mod cookies;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use routes::{
    CART_COUNT_HEADER, add_item_handler, cart_count_handler, cart_handler, clear_cart_handler,
    format_payment_handler, list_products_handler, payment_status_handler, product_handler,
    remove_item_handler, submit_payment_handler, update_item_handler,
};
use state::State;

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([CART_COUNT_HEADER, LOCATION])
        .max_age(state.config.cors_max_age);

    Router::new()
        .route("/products", get(list_products_handler))
        .route("/products/{id}", get(product_handler))
        .route("/cart", get(cart_handler).delete(clear_cart_handler))
        .route("/cart/count", get(cart_count_handler))
        .route("/cart/items", post(add_item_handler))
        .route(
            "/cart/items/{id}",
            put(update_item_handler).delete(remove_item_handler),
        )
        .route("/payment", post(submit_payment_handler))
        .route("/payment/format", post(format_payment_handler))
        .route("/payment/{id}", get(payment_status_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let config = Config::load()?;
    let state = State::new(config);

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

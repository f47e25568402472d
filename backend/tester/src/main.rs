use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Walks a running storefront through browse, cart and checkout.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://localhost:1111")]
    base_url: String,

    /// Give up on the payment after this many status polls.
    #[arg(long, default_value_t = 30)]
    max_polls: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let client = Client::builder().cookie_store(true).build()?;
    let url = |path: &str| format!("{}{path}", args.base_url.trim_end_matches('/'));

    let page: Value = client.get(url("/products")).send().await?.json().await?;
    let product_id = page["products"][0]["id"]
        .as_str()
        .context("Catalog is empty")?
        .to_string();
    info!("Listed {} products", page["totalCount"]);

    for _ in 0..2 {
        client
            .post(url("/cart/items"))
            .json(&json!({ "productId": product_id }))
            .send()
            .await?
            .error_for_status()?;
    }

    let count: Value = client.get(url("/cart/count")).send().await?.json().await?;
    ensure!(count["count"] == 2, "Expected 2 items in cart, got {}", count["count"]);
    info!("Cart holds product {product_id} twice");

    let preview: Value = client
        .post(url("/payment/format"))
        .json(&json!({ "cardNumber": "4242424242424242", "expiryDate": "1299", "cvv": "123" }))
        .send()
        .await?
        .json()
        .await?;
    info!("Card preview: {preview}");

    let response = client
        .post(url("/payment"))
        .json(&json!({
            "email": "tester@example.com",
            "cardName": "Smoke Tester",
            "cardNumber": preview["cardNumber"],
            "expiryDate": preview["expiryDate"],
            "cvv": preview["cvv"],
            "billingAddress": "1 Test Street",
        }))
        .send()
        .await?;
    ensure!(
        response.status() == StatusCode::ACCEPTED,
        "Payment rejected with {}",
        response.status()
    );

    let receipt: Value = response.json().await?;
    let payment_id = receipt["id"].as_str().context("Receipt has no id")?.to_string();
    info!("Payment {payment_id} submitted for {}", receipt["amount"]);

    for _ in 0..args.max_polls {
        let status: Value = client
            .get(url(&format!("/payment/{payment_id}")))
            .send()
            .await?
            .json()
            .await?;

        if status["status"] == "succeeded" {
            let count: Value = client.get(url("/cart/count")).send().await?.json().await?;
            ensure!(count["count"] == 0, "Cart was not cleared after payment");

            info!("Payment succeeded and cart was cleared");
            return Ok(());
        }

        sleep(Duration::from_secs(1)).await;
    }

    anyhow::bail!("Payment {payment_id} never succeeded")
}

use axum::{
    Json,
    http::{StatusCode, header::InvalidHeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::json;
use shop::{CartError, FieldErrors};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Cart is empty")]
    EmptyCart,

    #[error(transparent)]
    InvalidPayment(#[from] FieldErrors),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Header error: {0}")]
    Header(#[from] InvalidHeaderValue),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::InvalidQuantity => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyCart => StatusCode::CONFLICT,
            AppError::InvalidPayment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Cart(_) | AppError::Header(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        let body = match &self {
            AppError::InvalidPayment(fields) => json!({ "error": self.to_string(), "fields": fields }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

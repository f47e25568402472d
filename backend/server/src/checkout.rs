//! # Checkout
//!
//! Mocked payment processing.
//!
//! ## Flow
//! 1. The form is validated and the cart snapshot (total, item count) is taken
//! 2. Submission waits `PAYMENT_SUBMIT_DELAY_MS` to stand in for a gateway round trip
//! 3. The payment is recorded as `processing`
//! 4. Once `PAYMENT_PROCESSING_MS` has passed, the next status read marks it `succeeded`
//! 5. The response that reports success also expires the cart cookie
//!
//! Payments live in memory only and are lost on restart. Each submission drops
//! payments older than `PAYMENT_RETENTION_SECS`, whatever their status.
use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shop::{CardType, CartSummary, Price, ValidatedPayment};
use tokio::{sync::RwLock, time::Instant};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Processing,
    Succeeded,
}

struct Payment {
    details: ValidatedPayment,
    amount: Price,
    item_count: u64,
    status: PaymentStatus,
    submitted_at: Instant,
    submitted_on: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub amount: Price,
    pub item_count: u64,
    pub email: String,
    pub card_type: CardType,
    pub last4: String,
    pub submitted_at: DateTime<Utc>,
}

impl PaymentReceipt {
    fn new(id: Uuid, payment: &Payment) -> Self {
        Self {
            id,
            status: payment.status,
            amount: payment.amount,
            item_count: payment.item_count,
            email: payment.details.email.clone(),
            card_type: payment.details.card_type,
            last4: payment.details.last4.clone(),
            submitted_at: payment.submitted_on,
        }
    }
}

pub struct Payments {
    processing_time: Duration,
    retention: Duration,
    payments: RwLock<HashMap<Uuid, Payment>>,
}

impl Payments {
    pub fn new(processing_time: Duration, retention: Duration) -> Self {
        Self {
            processing_time,
            retention,
            payments: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }

    pub async fn submit(&self, details: ValidatedPayment, summary: &CartSummary) -> PaymentReceipt {
        let id = Uuid::new_v4();
        let payment = Payment {
            details,
            amount: summary.total,
            item_count: summary.total_items,
            status: PaymentStatus::Processing,
            submitted_at: Instant::now(),
            submitted_on: Utc::now(),
        };

        info!(
            "Payment {id} processing: {} for {} item(s) on {} ending {}",
            payment.amount,
            payment.item_count,
            payment.details.card_type.label(),
            payment.details.last4
        );

        let receipt = PaymentReceipt::new(id, &payment);

        let mut payments = self.payments.write().await;
        let before = payments.len();
        payments.retain(|_, stored| stored.submitted_at.elapsed() < self.retention);
        if payments.len() < before {
            debug!("Dropped {} expired payment(s)", before - payments.len());
        }
        payments.insert(id, payment);

        receipt
    }

    pub async fn status(&self, id: Uuid) -> Option<PaymentReceipt> {
        let mut payments = self.payments.write().await;
        let payment = payments.get_mut(&id)?;

        if payment.status == PaymentStatus::Processing
            && payment.submitted_at.elapsed() >= self.processing_time
        {
            payment.status = PaymentStatus::Succeeded;
            info!("Payment {id} succeeded");
        }

        Some(PaymentReceipt::new(id, payment))
    }
}

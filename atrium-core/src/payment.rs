use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pii::Masked;
use crate::CoreResult;

/// Payment channels accepted at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Bkash,
    Nagad,
    Bank,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Bkash => "BKASH",
            PaymentMethod::Nagad => "NAGAD",
            PaymentMethod::Bank => "BANK",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

/// A payment attempt recorded against a booking. The amount is fixed at
/// creation time to the booking total after any coupon discount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub amount: i64,
    pub status: PaymentStatus,
    /// Provider-issued settlement reference. Masked in logs like the
    /// customer's instrument.
    pub transaction_ref: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(booking_id: Uuid, method: PaymentMethod, amount: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            method,
            amount,
            status: PaymentStatus::Pending,
            transaction_ref: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Customer-supplied details for a payment attempt. Wallet and account
/// numbers are masked in Debug output so they never land in logs.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInstrument {
    /// bKash/Nagad wallet number or bank account number.
    pub account_number: Masked<String>,
    /// Customer-entered transaction id, where the channel issues one up front.
    pub reference: Option<String>,
}

/// Outcome of a settlement attempt with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { transaction_ref: String },
    Declined { reason: String },
}

/// Provider-side verification and settlement. The reservation core only
/// records outcomes; how bKash/Nagad/bank transfers are actually verified
/// lives behind this trait.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn settle(
        &self,
        payment: &Payment,
        instrument: &PaymentInstrument,
    ) -> CoreResult<SettlementOutcome>;
}

/// Processor that settles everything, used by tests and local development.
pub struct AutoSettleProcessor;

#[async_trait]
impl PaymentProcessor for AutoSettleProcessor {
    async fn settle(
        &self,
        payment: &Payment,
        instrument: &PaymentInstrument,
    ) -> CoreResult<SettlementOutcome> {
        // Trigger for exercising the decline path end to end
        if instrument.reference.as_deref() == Some("DECLINE") {
            return Ok(SettlementOutcome::Declined {
                reason: "Declined by provider".to_string(),
            });
        }

        tracing::info!(
            payment_id = %payment.id,
            method = payment.method.as_str(),
            amount = payment.amount,
            "Settling payment"
        );

        Ok(SettlementOutcome::Settled {
            transaction_ref: format!(
                "{}-{}",
                payment.method.as_str().to_lowercase(),
                payment.id.simple()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(reference: Option<&str>) -> PaymentInstrument {
        PaymentInstrument {
            account_number: Masked("01712345678".to_string()),
            reference: reference.map(|r| r.to_string()),
        }
    }

    #[tokio::test]
    async fn test_auto_settle_produces_transaction_ref() {
        let payment = Payment::new(Uuid::new_v4(), PaymentMethod::Bkash, 5000);
        let outcome = AutoSettleProcessor
            .settle(&payment, &instrument(None))
            .await
            .unwrap();

        match outcome {
            SettlementOutcome::Settled { transaction_ref } => {
                assert!(transaction_ref.starts_with("bkash-"));
            }
            other => panic!("expected settled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auto_settle_decline_trigger() {
        let payment = Payment::new(Uuid::new_v4(), PaymentMethod::Bank, 5000);
        let outcome = AutoSettleProcessor
            .settle(&payment, &instrument(Some("DECLINE")))
            .await
            .unwrap();

        assert!(matches!(outcome, SettlementOutcome::Declined { .. }));
    }

    #[test]
    fn test_instrument_debug_masks_account_number() {
        let rendered = format!("{:?}", instrument(None));
        assert!(!rendered.contains("01712345678"));
    }

    #[test]
    fn test_settled_payment_debug_masks_transaction_ref() {
        let mut payment = Payment::new(Uuid::new_v4(), PaymentMethod::Bkash, 5000);
        payment.status = PaymentStatus::Completed;
        payment.transaction_ref = Some(Masked("bkash-7f2k9".to_string()));

        let rendered = format!("{payment:?}");
        assert!(!rendered.contains("7f2k9"));
        assert!(rendered.contains("********"));
    }
}

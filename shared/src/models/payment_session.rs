//! Payment Session Model
//!
//! In-memory only; never persisted.

use serde::{Deserialize, Serialize};

/// Payment session status
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Declined,
    Cancelled,
    Expired,
}

impl PaymentStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    pub fn is_final(&self) -> bool {
        !self.is_pending()
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Declined => "declined",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// An in-flight request for a terminal to collect a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    /// `tpay_` + 32 hex
    pub payment_id: String,
    pub store_id: String,
    pub terminal_id: i64,
    /// Minor units (cents)
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub qr_code_url: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub updated_at: i64,
}

/// Initiate payment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreate {
    pub terminal_id: i64,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub reference: String,
}

/// Initiate response: the session plus whether it was pushed to a live device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiated {
    #[serde(flatten)]
    pub session: PaymentSession,
    /// `false` means the device will pick it up by polling
    pub delivered: bool,
}

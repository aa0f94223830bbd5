//! 终端设备协议
//!
//! Types exchanged with terminal firmware, both over the HTTP device API
//! (`/api/terminal/*`) and over the device WebSocket channel.
//!
//! ```text
//! hub ──► device   connected | payment.request | payment.cancel | heartbeat.ack
//! device ──► hub   heartbeat | payment.result
//! ```

use serde::{Deserialize, Serialize};

use crate::models::{DeviceInfo, PaymentSession, PaymentStatus};

/// Header carrying the terminal API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Advertised heartbeat interval (ms)
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Advertised reconnect delay (ms)
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// Connection parameters handed to a device after pairing and on `/config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalConfig {
    pub ws_endpoint: String,
    pub heartbeat_interval: u64,
    pub reconnect_delay: u64,
}

/// POST /pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    pub pairing_code: String,
    #[serde(default)]
    pub device_info: DeviceInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResponse {
    pub success: bool,
    pub terminal_id: i64,
    pub api_key: String,
    pub config: TerminalConfig,
}

/// GET /config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub terminal_id: i64,
    pub name: String,
    pub config: TerminalConfig,
}

/// POST /heartbeat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub success: bool,
    pub server_time: i64,
}

/// Payment as presented to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    pub payment_id: String,
    pub qr_data: String,
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub expires_at: i64,
}

impl From<&PaymentSession> for PendingPayment {
    fn from(session: &PaymentSession) -> Self {
        Self {
            payment_id: session.payment_id.clone(),
            qr_data: session.qr_code_url.clone(),
            amount: session.amount,
            currency: session.currency.clone(),
            reference: session.reference.clone(),
            expires_at: session.expires_at,
        }
    }
}

/// GET /payment/pending
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentResponse {
    pub has_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PendingPayment>,
}

impl PendingPaymentResponse {
    pub fn none() -> Self {
        Self {
            has_pending: false,
            payment: None,
        }
    }

    pub fn with(payment: PendingPayment) -> Self {
        Self {
            has_pending: true,
            payment: Some(payment),
        }
    }
}

/// Outcome a device may report for a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

impl From<PaymentOutcome> for PaymentStatus {
    fn from(outcome: PaymentOutcome) -> Self {
        match outcome {
            PaymentOutcome::Approved => PaymentStatus::Approved,
            PaymentOutcome::Declined => PaymentStatus::Declined,
        }
    }
}

/// POST /payment/{paymentId}/result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResultRequest {
    pub status: PaymentOutcome,
}

/// Hub → device messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    #[serde(rename = "connected")]
    Connected {
        terminal_id: i64,
        heartbeat_interval: u64,
    },
    #[serde(rename = "payment.request")]
    PaymentRequest(PendingPayment),
    #[serde(rename = "payment.cancel")]
    PaymentCancel { payment_id: String },
    #[serde(rename = "heartbeat.ack")]
    HeartbeatAck { server_time: i64 },
}

/// Device → hub messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum DeviceMessage {
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "payment.result")]
    PaymentResult {
        payment_id: String,
        status: PaymentOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_wire_shape() {
        let msg = ServerMessage::PaymentRequest(PendingPayment {
            payment_id: "tpay_abc".into(),
            qr_data: "https://shop.example/pay/terminal/tpay_abc".into(),
            amount: 1500,
            currency: "CAD".into(),
            reference: "order-17".into(),
            expires_at: 42,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "payment.request");
        assert_eq!(json["paymentId"], "tpay_abc");
        assert_eq!(json["amount"], 1500);
        assert_eq!(json["expiresAt"], 42);

        let back: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_payment_cancel_wire_shape() {
        let json = serde_json::to_string(&ServerMessage::PaymentCancel {
            payment_id: "tpay_1".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"payment.cancel","paymentId":"tpay_1"}"#);
    }

    #[test]
    fn test_device_messages_parse() {
        let hb: DeviceMessage = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(hb, DeviceMessage::Heartbeat);

        let result: DeviceMessage = serde_json::from_str(
            r#"{"type":"payment.result","paymentId":"tpay_9","status":"declined"}"#,
        )
        .unwrap();
        assert_eq!(
            result,
            DeviceMessage::PaymentResult {
                payment_id: "tpay_9".into(),
                status: PaymentOutcome::Declined,
            }
        );

        assert!(serde_json::from_str::<DeviceMessage>(r#"{"type":"reboot"}"#).is_err());
    }

    #[test]
    fn test_pending_response_omits_payment_when_empty() {
        let json = serde_json::to_string(&PendingPaymentResponse::none()).unwrap();
        assert_eq!(json, r#"{"hasPending":false}"#);
    }

    #[test]
    fn test_pair_request_without_device_info() {
        let req: PairRequest = serde_json::from_str(r#"{"pairingCode":"123456"}"#).unwrap();
        assert_eq!(req.pairing_code, "123456");
        assert_eq!(req.device_info, DeviceInfo::default());
    }
}

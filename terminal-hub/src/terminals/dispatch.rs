//! Dispatch to devices
//!
//! Push over the live channel when there is one; otherwise the session waits
//! for the device to poll `GET /api/terminal/payment/pending`. Not being
//! connected, or a device whose queue is full, is a normal outcome reported
//! as `false`. Dispatch never waits on a device.

use shared::models::PaymentSession;
use shared::terminal::{PendingPayment, ServerMessage};
use tokio::sync::mpsc::error::TrySendError;

use super::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct Dispatcher {
    registry: ConnectionRegistry,
}

impl Dispatcher {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn send_payment_request(&self, terminal_id: i64, session: &PaymentSession) -> bool {
        let delivered = self
            .send(
                terminal_id,
                ServerMessage::PaymentRequest(PendingPayment::from(session)),
            );
        tracing::info!(
            terminal_id = terminal_id,
            payment_id = %session.payment_id,
            delivered = delivered,
            "Payment request dispatched"
        );
        delivered
    }

    pub fn send_payment_cancel(&self, terminal_id: i64, payment_id: &str) -> bool {
        let delivered = self
            .send(
                terminal_id,
                ServerMessage::PaymentCancel {
                    payment_id: payment_id.to_string(),
                },
            );
        tracing::info!(
            terminal_id = terminal_id,
            payment_id = %payment_id,
            delivered = delivered,
            "Payment cancel dispatched"
        );
        delivered
    }

    fn send(&self, terminal_id: i64, message: ServerMessage) -> bool {
        let Some(conn) = self.registry.get(terminal_id) else {
            return false;
        };
        match conn.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // 设备积压，会话仍可通过轮询获取
                tracing::warn!(terminal_id = terminal_id, "Terminal queue full, leaving session to polling");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(terminal_id = terminal_id, "Terminal channel closed, dropping connection");
                self.registry.unregister_if(terminal_id, conn.connection_id);
                false
            }
        }
    }
}

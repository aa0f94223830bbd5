//! PaymentSessionManager - 终端支付会话
//!
//! In-memory table of in-flight device payments keyed by `paymentId`.
//!
//! - `pending` is the only state that accepts a transition
//! - every read is scoped by `store_id`; another store's session reads as absent
//! - expiry is decided by [`expired_at`] both on reads and in the sweep

use std::sync::Arc;

use dashmap::DashMap;
use shared::models::{PaymentCreate, PaymentSession, PaymentStatus};
use shared::terminal::PaymentOutcome;
use shared::util::now_millis;

use super::error::{Entity, TerminalError, TerminalResult};
use super::ids::IdGenerator;

/// Finished sessions stay readable this long for checkout polling
pub const FINISHED_RETENTION_MS: i64 = 60 * 60 * 1000;

/// `true` when a pending session's window has passed at `now`.
///
/// The single expiry rule: reads and the periodic sweep both call this.
pub fn expired_at(now: i64, session: &PaymentSession) -> bool {
    session.status.is_pending() && session.expires_at < now
}

/// Apply the expiry rule in place; returns `true` if the session flipped
fn settle_expiry(now: i64, session: &mut PaymentSession) -> bool {
    if expired_at(now, session) {
        session.status = PaymentStatus::Expired;
        session.updated_at = now;
        tracing::info!(
            payment_id = %session.payment_id,
            store_id = %session.store_id,
            terminal_id = session.terminal_id,
            "Payment session expired"
        );
        true
    } else {
        false
    }
}

#[derive(Clone, Debug)]
pub struct PaymentSessionManager {
    sessions: Arc<DashMap<String, PaymentSession>>,
    ids: Arc<IdGenerator>,
    ttl_ms: i64,
    qr_base_url: String,
}

impl PaymentSessionManager {
    /// `public_base_url` is where the checkout page for `qrCodeUrl` lives
    pub fn new(ids: Arc<IdGenerator>, ttl_ms: i64, public_base_url: &str) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ids,
            ttl_ms,
            qr_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Open a `pending` session for `store_id`. Delivery is the dispatcher's job.
    pub fn initiate_payment(&self, store_id: &str, req: &PaymentCreate) -> TerminalResult<PaymentSession> {
        self.initiate_payment_at(store_id, req, now_millis())
    }

    pub fn initiate_payment_at(
        &self,
        store_id: &str,
        req: &PaymentCreate,
        now: i64,
    ) -> TerminalResult<PaymentSession> {
        if req.amount <= 0 {
            return Err(TerminalError::Validation("Amount must be positive".into()));
        }
        let currency = req.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(TerminalError::Validation(format!(
                "Invalid currency code: {}",
                req.currency
            )));
        }

        let payment_id = self.ids.payment_id();
        let session = PaymentSession {
            qr_code_url: format!("{}/pay/terminal/{}", self.qr_base_url, payment_id),
            payment_id: payment_id.clone(),
            store_id: store_id.to_string(),
            terminal_id: req.terminal_id,
            amount: req.amount,
            currency,
            reference: req.reference.trim().to_string(),
            status: PaymentStatus::Pending,
            created_at: now,
            expires_at: now + self.ttl_ms,
            updated_at: now,
        };
        self.sessions.insert(payment_id, session.clone());

        tracing::info!(
            payment_id = %session.payment_id,
            store_id = %store_id,
            terminal_id = session.terminal_id,
            amount = session.amount,
            currency = %session.currency,
            "Payment session initiated"
        );
        Ok(session)
    }

    /// `None` when unknown or owned by another store
    pub fn get_payment_status(&self, store_id: &str, payment_id: &str) -> Option<PaymentSession> {
        self.get_payment_status_at(store_id, payment_id, now_millis())
    }

    pub fn get_payment_status_at(
        &self,
        store_id: &str,
        payment_id: &str,
        now: i64,
    ) -> Option<PaymentSession> {
        let mut entry = self.sessions.get_mut(payment_id)?;
        if entry.store_id != store_id {
            return None;
        }
        settle_expiry(now, entry.value_mut());
        Some(entry.clone())
    }

    /// Unconditional transition. Callers check `pending` first.
    pub fn update_payment_status(&self, payment_id: &str, status: PaymentStatus) -> Option<PaymentSession> {
        let mut entry = self.sessions.get_mut(payment_id)?;
        let from = entry.status;
        entry.status = status;
        entry.updated_at = now_millis();
        tracing::info!(payment_id = %payment_id, from = %from, to = %status, "Payment status updated");
        Some(entry.clone())
    }

    pub fn cancel_payment(&self, store_id: &str, payment_id: &str) -> TerminalResult<PaymentSession> {
        self.cancel_payment_at(store_id, payment_id, now_millis())
    }

    pub fn cancel_payment_at(
        &self,
        store_id: &str,
        payment_id: &str,
        now: i64,
    ) -> TerminalResult<PaymentSession> {
        let mut entry = self
            .sessions
            .get_mut(payment_id)
            .filter(|s| s.store_id == store_id)
            .ok_or(TerminalError::NotFound(Entity::Payment))?;

        settle_expiry(now, entry.value_mut());
        if !entry.status.is_pending() {
            return Err(TerminalError::InvalidState("Payment cannot be cancelled".into()));
        }
        entry.status = PaymentStatus::Cancelled;
        entry.updated_at = now;

        tracing::info!(payment_id = %payment_id, store_id = %store_id, "Payment cancelled");
        Ok(entry.clone())
    }

    /// Result reported by the device the session was addressed to
    pub fn complete_payment(
        &self,
        store_id: &str,
        terminal_id: i64,
        payment_id: &str,
        outcome: PaymentOutcome,
    ) -> TerminalResult<PaymentSession> {
        self.complete_payment_at(store_id, terminal_id, payment_id, outcome, now_millis())
    }

    pub fn complete_payment_at(
        &self,
        store_id: &str,
        terminal_id: i64,
        payment_id: &str,
        outcome: PaymentOutcome,
        now: i64,
    ) -> TerminalResult<PaymentSession> {
        // check and transition under one entry lock
        let mut entry = self
            .sessions
            .get_mut(payment_id)
            .filter(|s| s.store_id == store_id && s.terminal_id == terminal_id)
            .ok_or(TerminalError::NotFound(Entity::Payment))?;

        settle_expiry(now, entry.value_mut());
        if !entry.status.is_pending() {
            return Err(TerminalError::InvalidState(format!(
                "Payment is already {}",
                entry.status
            )));
        }
        let status: PaymentStatus = outcome.into();
        entry.status = status;
        entry.updated_at = now;

        tracing::info!(
            payment_id = %payment_id,
            store_id = %store_id,
            terminal_id = terminal_id,
            status = %status,
            "Payment completed by terminal"
        );
        Ok(entry.clone())
    }

    /// Pending sessions of a store, oldest first
    pub fn get_active_payments(&self, store_id: &str) -> Vec<PaymentSession> {
        self.get_active_payments_at(store_id, now_millis())
    }

    pub fn get_active_payments_at(&self, store_id: &str, now: i64) -> Vec<PaymentSession> {
        self.collect_pending(now, |s| s.store_id == store_id)
    }

    /// Pending sessions addressed to one terminal, oldest first
    pub fn pending_for_terminal(&self, store_id: &str, terminal_id: i64) -> Vec<PaymentSession> {
        self.pending_for_terminal_at(store_id, terminal_id, now_millis())
    }

    pub fn pending_for_terminal_at(
        &self,
        store_id: &str,
        terminal_id: i64,
        now: i64,
    ) -> Vec<PaymentSession> {
        self.collect_pending(now, |s| s.store_id == store_id && s.terminal_id == terminal_id)
    }

    fn collect_pending(&self, now: i64, filter: impl Fn(&PaymentSession) -> bool) -> Vec<PaymentSession> {
        let mut pending: Vec<PaymentSession> = self
            .sessions
            .iter_mut()
            .filter_map(|mut entry| {
                if !filter(entry.value()) {
                    return None;
                }
                settle_expiry(now, entry.value_mut());
                entry.status.is_pending().then(|| entry.clone())
            })
            .collect();
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.payment_id.cmp(&b.payment_id))
        });
        pending
    }

    /// Flip overdue `pending` sessions to `expired`; returns how many changed
    pub fn cleanup_expired_sessions(&self) -> usize {
        self.cleanup_expired_sessions_at(now_millis())
    }

    pub fn cleanup_expired_sessions_at(&self, now: i64) -> usize {
        self.sessions
            .iter_mut()
            .map(|mut entry| settle_expiry(now, entry.value_mut()))
            .filter(|changed| *changed)
            .count()
    }

    /// Forget finished sessions not touched for `retention_ms`
    pub fn purge_finished_at(&self, now: i64, retention_ms: i64) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.status.is_pending() || now - s.updated_at <= retention_ms);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of sessions still pending (health)
    pub fn active_count(&self) -> usize {
        self.sessions.iter().filter(|e| e.status.is_pending()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

//! 配对流程
//!
//! A pairing code is a short-lived 6-digit secret shown on the admin screen
//! and typed into the device. Redeeming it hands the device its API key.
//!
//! Invariants kept here:
//! - at most one redeemable code per terminal (issuing a new one marks the
//!   older ones used, in the same transaction)
//! - a code redeems at most once (`mark_used` is conditional on
//!   `used_at IS NULL`)
//! - codes only match within their own store

use std::sync::Arc;

use shared::models::{DeviceInfo, PairingCode, Terminal, TerminalStatus};
use shared::util::now_millis;
use sqlx::{SqliteConnection, SqlitePool};

use super::error::{Entity, TerminalError, TerminalResult};
use super::ids::IdGenerator;
use crate::db::repository::{RepoError, pairing_code, terminal};

/// Attempts at drawing a code that no other terminal of the store holds
const MAX_CODE_ATTEMPTS: usize = 16;

/// Outcome of a successful pairing
#[derive(Debug, Clone)]
pub struct PairingResult {
    pub terminal: Terminal,
    pub api_key: String,
}

#[derive(Clone, Debug)]
pub struct PairingManager {
    pool: SqlitePool,
    ids: Arc<IdGenerator>,
    ttl_ms: i64,
}

impl PairingManager {
    pub fn new(pool: SqlitePool, ids: Arc<IdGenerator>, ttl_ms: i64) -> Self {
        Self { pool, ids, ttl_ms }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Invalidate every outstanding code of the terminal and issue a new one.
    /// The terminal goes back to `pairing`.
    pub async fn regenerate_pairing_code(
        &self,
        store_id: &str,
        terminal_id: i64,
    ) -> TerminalResult<PairingCode> {
        self.regenerate_pairing_code_at(store_id, terminal_id, now_millis())
            .await
    }

    pub async fn regenerate_pairing_code_at(
        &self,
        store_id: &str,
        terminal_id: i64,
        now: i64,
    ) -> TerminalResult<PairingCode> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        let Some(found) = terminal::find_in_store(&mut *tx, store_id, terminal_id).await? else {
            return Err(TerminalError::NotFound(Entity::Terminal));
        };

        let invalidated = pairing_code::invalidate_for_terminal(&mut *tx, terminal_id, now).await?;
        let code = self.issue_code(&mut *tx, &found, now).await?;
        terminal::set_status(&mut *tx, terminal_id, TerminalStatus::Pairing, now).await?;

        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            store_id = %store_id,
            terminal_id = terminal_id,
            invalidated = invalidated,
            expires_at = code.expires_at,
            "Pairing code regenerated"
        );
        Ok(code)
    }

    /// Redeem `code` for the store. `Ok(None)` means no usable code matched
    /// (unknown, expired, already used or issued by another store).
    pub async fn complete_pairing(
        &self,
        store_id: &str,
        code: &str,
        device: &DeviceInfo,
    ) -> TerminalResult<Option<PairingResult>> {
        self.complete_pairing_at(store_id, code, device, now_millis())
            .await
    }

    pub async fn complete_pairing_at(
        &self,
        store_id: &str,
        code: &str,
        device: &DeviceInfo,
        now: i64,
    ) -> TerminalResult<Option<PairingResult>> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        let Some(found) = pairing_code::find_redeemable(&mut *tx, store_id, code, now).await? else {
            tracing::debug!(store_id = %store_id, "Pairing code did not match");
            return Ok(None);
        };

        // 并发兑换时只有一方能成功
        if !pairing_code::mark_used(&mut *tx, found.id, now).await? {
            return Ok(None);
        }

        terminal::apply_pairing(&mut *tx, found.terminal_id, device, now).await?;
        let Some(paired) = terminal::find_in_store(&mut *tx, store_id, found.terminal_id).await?
        else {
            return Ok(None);
        };

        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            store_id = %store_id,
            terminal_id = paired.id,
            device_model = ?paired.device_model,
            "Terminal paired"
        );
        Ok(Some(PairingResult {
            api_key: paired.api_key.clone(),
            terminal: paired,
        }))
    }

    /// Insert a fresh code for `owner` on an open transaction.
    ///
    /// Redraws while the value collides with another redeemable code of the
    /// same store, so a typed code always identifies one terminal.
    pub(crate) async fn issue_code(
        &self,
        conn: &mut SqliteConnection,
        owner: &Terminal,
        now: i64,
    ) -> TerminalResult<PairingCode> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let value = self.ids.pairing_code();
            if pairing_code::find_redeemable(&mut *conn, &owner.store_id, &value, now)
                .await?
                .is_some()
            {
                tracing::debug!(store_id = %owner.store_id, "Pairing code collision, redrawing");
                continue;
            }

            let code = PairingCode {
                id: self.ids.record_id(),
                store_id: owner.store_id.clone(),
                code: value,
                terminal_id: owner.id,
                terminal_name: owner.name.clone(),
                expires_at: now + self.ttl_ms,
                used_at: None,
                created_at: now,
            };
            pairing_code::insert(&mut *conn, &code).await?;
            return Ok(code);
        }

        tracing::error!(store_id = %owner.store_id, "Could not draw a unique pairing code");
        Err(TerminalError::CodeSpaceExhausted)
    }
}

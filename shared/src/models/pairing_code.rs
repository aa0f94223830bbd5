//! Pairing Code Model

use serde::{Deserialize, Serialize};

/// Short-lived 6-digit credential binding a terminal record to a device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PairingCode {
    pub id: i64,
    pub store_id: String,
    pub code: String,
    pub terminal_id: i64,
    pub terminal_name: String,
    pub expires_at: i64,
    pub used_at: Option<i64>,
    pub created_at: i64,
}

impl PairingCode {
    /// Unused and not yet expired at `now` (`expires_at` itself still counts)
    pub fn is_redeemable(&self, now: i64) -> bool {
        self.used_at.is_none() && self.expires_at >= now
    }
}

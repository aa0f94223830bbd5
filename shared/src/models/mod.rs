//! Data models
//!
//! Shared between terminal-hub and its HTTP clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Record IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.

pub mod pairing_code;
pub mod payment_session;
pub mod terminal;

// Re-exports
pub use pairing_code::*;
pub use payment_session::*;
pub use terminal::*;

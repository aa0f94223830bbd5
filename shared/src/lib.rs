//! Shared types for the terminal hub
//!
//! Common types used by the hub service and by device-facing clients:
//! persisted models, the device wire protocol, error types and small utilities.

pub mod error;
pub mod models;
pub mod terminal;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};

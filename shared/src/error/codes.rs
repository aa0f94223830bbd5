//! Unified error codes for the terminal hub
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors (API key, admin token)
//! - 5xxx: Payment session errors
//! - 7xxx: Terminal / pairing errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as its `u16` value so device firmware and the checkout
/// frontend can branch on it without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    Unknown = 1,
    ValidationFailed = 2,

    // ==================== 1xxx: Auth ====================
    /// No credential presented
    NotAuthenticated = 1001,
    /// API key unknown, revoked, or issued by another store
    ApiKeyInvalid = 1002,
    /// Admin token wrong
    TokenInvalid = 1004,

    // ==================== 5xxx: Payment ====================
    PaymentNotFound = 5001,
    /// Session already approved, declined, cancelled or expired
    PaymentNotPending = 5002,

    // ==================== 7xxx: Terminal ====================
    TerminalNotFound = 7001,
    /// Malformed, expired, used, unknown, or from another store
    PairingCodeInvalid = 7101,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Every code, in numeric order
    pub const ALL: [ErrorCode; 12] = [
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotAuthenticated,
        ErrorCode::ApiKeyInvalid,
        ErrorCode::TokenInvalid,
        ErrorCode::PaymentNotFound,
        ErrorCode::PaymentNotPending,
        ErrorCode::TerminalNotFound,
        ErrorCode::PairingCodeInvalid,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
    ];

    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default English message, used when no specific message is given
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "OK",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::ApiKeyInvalid => "Invalid API key",
            ErrorCode::TokenInvalid => "Invalid admin token",
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentNotPending => "Payment cannot be cancelled",
            ErrorCode::TerminalNotFound => "Terminal not found",
            ErrorCode::PairingCodeInvalid => "Invalid or expired pairing code",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A `u16` that is not a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|c| c.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// HTTP status for responses carrying this code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::ValidationFailed | Self::PaymentNotPending | Self::PairingCodeInvalid => {
                StatusCode::BAD_REQUEST
            }
            Self::NotAuthenticated | Self::ApiKeyInvalid | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::PaymentNotFound | Self::TerminalNotFound => StatusCode::NOT_FOUND,
            Self::Unknown | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_status_follows_category() {
        for code in ErrorCode::ALL {
            let status = code.http_status();
            match code.category() {
                ErrorCategory::Auth => assert_eq!(status, StatusCode::UNAUTHORIZED, "{code}"),
                ErrorCategory::System => assert!(status.is_server_error(), "{code}"),
                _ if code.is_success() => assert_eq!(status, StatusCode::OK),
                _ if code == ErrorCode::Unknown => assert!(status.is_server_error()),
                _ => assert!(status.is_client_error(), "{code}"),
            }
        }
    }

    #[test]
    fn test_not_found_codes() {
        assert_eq!(ErrorCode::PaymentNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::TerminalNotFound.http_status(), StatusCode::NOT_FOUND);
    }
}

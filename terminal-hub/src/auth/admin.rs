//! 管理端认证中间件
//!
//! Admin and checkout routes require the deployment's admin token, either as
//! `Authorization: Bearer <token>` or as `x-admin-token`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::AppError;

use crate::core::ServerState;
use crate::security_log;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub async fn require_admin(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS 预检
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let authorized = presented_token(req.headers())
        .map(|token| token_matches(token, &state.config.admin_api_token));

    match authorized {
        Some(true) => Ok(next.run(req).await),
        Some(false) => {
            security_log!("WARN", "admin_auth_failed", uri = format!("{}", req.uri()));
            Err(AppError::invalid_token("Invalid admin token"))
        }
        None => {
            security_log!("WARN", "admin_auth_missing", uri = format!("{}", req.uri()));
            Err(AppError::unauthorized())
        }
    }
}

/// Bearer token first, then `x-admin-token`; blank values count as absent
fn presented_token(headers: &http::HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| {
        headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

fn bearer_token(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 未配置令牌时一律拒绝
fn token_matches(presented: &str, configured: &str) -> bool {
    !configured.is_empty() && constant_time_eq(presented.as_bytes(), configured.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

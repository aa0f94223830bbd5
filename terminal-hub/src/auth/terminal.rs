//! Terminal API-key extractor
//!
//! Device endpoints authenticate with `x-api-key`. A key that belongs to
//! another store is rejected exactly like an unknown key.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use shared::AppError;
use shared::models::Terminal;
use shared::terminal::API_KEY_HEADER;

use crate::core::ServerState;
use crate::security_log;

/// The authenticated device behind a request
#[derive(Debug, Clone)]
pub struct TerminalIdentity {
    pub terminal: Terminal,
    /// Caller address (`x-forwarded-for` first hop, else the socket peer)
    pub ip: Option<String>,
}

impl TerminalIdentity {
    pub fn id(&self) -> i64 {
        self.terminal.id
    }
}

impl FromRequestParts<ServerState> for TerminalIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let Some(api_key) = api_key else {
            security_log!("WARN", "api_key_missing", uri = format!("{}", parts.uri));
            return Err(AppError::unauthorized());
        };

        let terminal = state
            .terminals
            .get_terminal_by_api_key(api_key)
            .await
            .map_err(AppError::from)?;

        match terminal {
            Some(t) if t.store_id == state.store_id() => Ok(Self {
                terminal: t,
                ip: client_ip(parts),
            }),
            Some(t) => {
                security_log!(
                    "WARN",
                    "api_key_cross_store",
                    terminal_id = t.id,
                    key_store = t.store_id.clone(),
                    uri = format!("{}", parts.uri)
                );
                Err(AppError::invalid_api_key())
            }
            None => {
                security_log!("WARN", "api_key_invalid", uri = format!("{}", parts.uri));
                Err(AppError::invalid_api_key())
            }
        }
    }
}

/// Best-effort caller IP
pub fn client_ip(parts: &Parts) -> Option<String> {
    let forwarded = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    forwarded.or_else(|| {
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let p = parts(Request::builder().header("x-forwarded-for", "203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip(&p).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut p = parts(Request::builder());
        assert!(client_ip(&p).is_none());
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 40], 5000))));
        assert_eq!(client_ip(&p).as_deref(), Some("192.168.1.40"));
    }
}

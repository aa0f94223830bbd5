//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 健康检查 + 在线终端/会话计数 | 无 |
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "storeId": "default-store",
//!   "database": "ok", "connectedTerminals": 2, "activeSessions": 1 }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    store_id: String,
    /// ok | error
    database: &'static str,
    connected_terminals: usize,
    active_sessions: usize,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let database_ok = sqlx::query("SELECT 1").execute(&state.db.pool).await.is_ok();

    Json(HealthResponse {
        status: if database_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store_id: state.store_id().to_string(),
        database: if database_ok { "ok" } else { "error" },
        connected_terminals: state.connections.len(),
        active_sessions: state.payments.active_count(),
    })
}

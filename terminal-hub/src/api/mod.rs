//! API 路由模块
//!
//! - [`health`] - 健康检查
//! - [`terminal`] - 终端设备接口（配对、心跳、轮询、WebSocket）
//! - [`admin`] - 终端管理接口（admin token）
//! - [`payments`] - 结账支付接口（admin token）

pub mod admin;
pub mod health;
pub mod payments;
pub mod terminal;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::core::ServerState;

/// Create the combined router
pub fn build_app(state: ServerState) -> Router {
    let protected = Router::new()
        .merge(admin::router())
        .merge(payments::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(health::router())
        .merge(terminal::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Checkout payment API 模块 (admin token)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/terminal-payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_active).post(handler::create))
        .route("/{payment_id}", get(handler::get_status))
        .route("/{payment_id}/cancel", post(handler::cancel))
}

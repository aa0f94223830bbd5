//! Terminal device API
//!
//! | 路径 | 方法 | 认证 |
//! |------|------|------|
//! | /api/terminal/pair | POST | 配对码 |
//! | /api/terminal/config | GET | x-api-key |
//! | /api/terminal/heartbeat | POST | x-api-key |
//! | /api/terminal/payment/pending | GET | x-api-key |
//! | /api/terminal/payment/{paymentId}/result | POST | x-api-key |
//! | /api/terminal/ws | GET (upgrade) | x-api-key |

mod handler;
pub mod ws;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/terminal", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/pair", post(handler::pair))
        .route("/config", get(handler::config))
        .route("/heartbeat", post(handler::heartbeat))
        .route("/payment/pending", get(handler::pending_payment))
        .route("/payment/{payment_id}/result", post(handler::payment_result))
        .route("/ws", get(ws::handle_terminal_ws))
}

//! Checkout payment API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{PaymentCreate, PaymentInitiated, PaymentSession};
use shared::AppResult;

use crate::core::ServerState;
use crate::terminals::{Entity, TerminalError};

/// POST /api/terminal-payments - 发起终端支付
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<PaymentCreate>,
) -> AppResult<Json<PaymentInitiated>> {
    // 终端必须属于本门店
    state
        .terminals
        .get_terminal_in_store(state.store_id(), payload.terminal_id)
        .await?
        .ok_or(TerminalError::NotFound(Entity::Terminal))?;

    let session = state.payments.initiate_payment(state.store_id(), &payload)?;
    let delivered = state
        .dispatcher
        .send_payment_request(session.terminal_id, &session);

    Ok(Json(PaymentInitiated { session, delivered }))
}

/// GET /api/terminal-payments - 本门店待处理支付
pub async fn list_active(State(state): State<ServerState>) -> Json<Vec<PaymentSession>> {
    Json(state.payments.get_active_payments(state.store_id()))
}

/// GET /api/terminal-payments/{paymentId} - 查询状态（结账页轮询）
pub async fn get_status(
    State(state): State<ServerState>,
    Path(payment_id): Path<String>,
) -> AppResult<Json<PaymentSession>> {
    let session = state
        .payments
        .get_payment_status(state.store_id(), &payment_id)
        .ok_or(TerminalError::NotFound(Entity::Payment))?;
    Ok(Json(session))
}

/// POST /api/terminal-payments/{paymentId}/cancel - 取消并通知终端
pub async fn cancel(
    State(state): State<ServerState>,
    Path(payment_id): Path<String>,
) -> AppResult<Json<PaymentSession>> {
    let session = state.payments.cancel_payment(state.store_id(), &payment_id)?;
    state
        .dispatcher
        .send_payment_cancel(session.terminal_id, &session.payment_id);
    Ok(Json(session))
}

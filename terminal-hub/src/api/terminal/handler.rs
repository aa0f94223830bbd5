//! Terminal device API handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use shared::models::{PaymentSession, TerminalStatus};
use shared::terminal::{
    ConfigResponse, HeartbeatResponse, PairRequest, PairResponse, PaymentResultRequest,
    PendingPayment, PendingPaymentResponse,
};
use shared::util::{is_pairing_code, now_millis, strip_whitespace};
use shared::{AppError, AppResult};

use crate::auth::TerminalIdentity;
use crate::core::ServerState;
use crate::security_log;

/// POST /api/terminal/pair - 用配对码换取 API key
pub async fn pair(
    State(state): State<ServerState>,
    body: Result<Json<PairRequest>, JsonRejection>,
) -> AppResult<Json<PairResponse>> {
    // 缺少或非字符串的 pairingCode 与格式错误同样处理
    let Json(req) = body.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable pair request");
        AppError::pairing_code_invalid("Pairing code must be 6 digits")
    })?;

    let code = strip_whitespace(&req.pairing_code);
    if !is_pairing_code(&code) {
        return Err(AppError::pairing_code_invalid("Pairing code must be 6 digits"));
    }

    let paired = state
        .pairing
        .complete_pairing(state.store_id(), &code, &req.device_info)
        .await?;

    let Some(result) = paired else {
        security_log!("WARN", "pairing_rejected", store_id = state.store_id().to_string());
        return Err(AppError::pairing_code_invalid("Invalid or expired pairing code"));
    };

    Ok(Json(PairResponse {
        success: true,
        terminal_id: result.terminal.id,
        api_key: result.api_key,
        config: state.config.terminal_config(),
    }))
}

/// GET /api/terminal/config
pub async fn config(
    State(state): State<ServerState>,
    identity: TerminalIdentity,
) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        terminal_id: identity.terminal.id,
        name: identity.terminal.name,
        config: state.config.terminal_config(),
    })
}

/// POST /api/terminal/heartbeat - 标记在线并记录来源 IP
pub async fn heartbeat(
    State(state): State<ServerState>,
    identity: TerminalIdentity,
) -> AppResult<Json<HeartbeatResponse>> {
    state
        .terminals
        .update_terminal_status(identity.id(), TerminalStatus::Online, identity.ip.as_deref())
        .await?;
    state.connections.touch_heartbeat(identity.id());

    Ok(Json(HeartbeatResponse {
        success: true,
        server_time: now_millis(),
    }))
}

/// GET /api/terminal/payment/pending - 轮询待处理支付（最早的一笔）
pub async fn pending_payment(
    State(state): State<ServerState>,
    identity: TerminalIdentity,
) -> Json<PendingPaymentResponse> {
    let pending = state
        .payments
        .pending_for_terminal(state.store_id(), identity.id());

    Json(match pending.first() {
        Some(session) => PendingPaymentResponse::with(PendingPayment::from(session)),
        None => PendingPaymentResponse::none(),
    })
}

/// POST /api/terminal/payment/{paymentId}/result - 设备上报支付结果
pub async fn payment_result(
    State(state): State<ServerState>,
    identity: TerminalIdentity,
    Path(payment_id): Path<String>,
    Json(req): Json<PaymentResultRequest>,
) -> AppResult<Json<PaymentSession>> {
    let session = state.payments.complete_payment(
        state.store_id(),
        identity.id(),
        &payment_id,
        req.status,
    )?;
    Ok(Json(session))
}

//! Admin terminal API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{CreatedTerminal, PairingCode, TerminalCreate, TerminalOverview};
use shared::{ApiResponse, AppResult};

use crate::core::ServerState;
use crate::terminals::{Entity, TerminalError};

/// POST /api/admin/terminals - 创建终端并生成首个配对码
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<TerminalCreate>,
) -> AppResult<Json<CreatedTerminal>> {
    let created = state
        .terminals
        .create_terminal(state.store_id(), &payload.name)
        .await?;
    Ok(Json(created))
}

/// GET /api/admin/terminals - 按名称排序，附带在线状态
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<TerminalOverview>>> {
    let terminals = state.terminals.get_terminals(state.store_id()).await?;
    let overview = terminals
        .into_iter()
        .map(|terminal| TerminalOverview {
            connected: state.connections.is_connected(terminal.id),
            terminal,
        })
        .collect();
    Ok(Json(overview))
}

/// GET /api/admin/terminals/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<TerminalOverview>> {
    let terminal = state
        .terminals
        .get_terminal_in_store(state.store_id(), id)
        .await?
        .ok_or(TerminalError::NotFound(Entity::Terminal))?;
    Ok(Json(TerminalOverview {
        connected: state.connections.is_connected(terminal.id),
        terminal,
    }))
}

/// DELETE /api/admin/terminals/{id} - 删除终端并断开其连接
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse>> {
    state.terminals.delete_terminal(state.store_id(), id).await?;
    if state.connections.unregister(id) {
        tracing::info!(terminal_id = id, "Dropped live connection of deleted terminal");
    }
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/admin/terminals/{id}/pairing-code - 重新生成配对码
pub async fn regenerate_pairing_code(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PairingCode>> {
    let code = state
        .pairing
        .regenerate_pairing_code(state.store_id(), id)
        .await?;
    Ok(Json(code))
}

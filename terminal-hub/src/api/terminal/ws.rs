//! Device WebSocket channel
//!
//! One socket per terminal. Outbound pushes (payment.request / payment.cancel)
//! arrive through the registry's mpsc sender; replacing or evicting the
//! registry entry drops that sender, which ends this loop.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use shared::models::TerminalStatus;
use shared::terminal::{DeviceMessage, PendingPayment, ServerMessage};
use shared::util::now_millis;
use tokio::sync::mpsc;

use crate::auth::TerminalIdentity;
use crate::core::ServerState;
use crate::terminals::registry::CONNECTION_CHANNEL_CAPACITY;

/// GET /api/terminal/ws - upgrade to WebSocket
pub async fn handle_terminal_ws(
    State(state): State<ServerState>,
    identity: TerminalIdentity,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, identity))
}

async fn handle_ws_connection(socket: WebSocket, state: ServerState, identity: TerminalIdentity) {
    let terminal_id = identity.id();
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(CONNECTION_CHANNEL_CAPACITY);

    let connection_id = state.connections.register(terminal_id, msg_tx);
    if let Err(e) = state
        .terminals
        .update_terminal_status(terminal_id, TerminalStatus::Online, identity.ip.as_deref())
        .await
    {
        tracing::warn!(terminal_id, error = %e, "Failed to mark terminal online");
    }
    tracing::info!(terminal_id, connection_id, ip = ?identity.ip, "Terminal WebSocket connected");

    let welcome = ServerMessage::Connected {
        terminal_id,
        heartbeat_interval: state.config.heartbeat_interval_ms,
    };
    if send_json(&mut ws_sink, &welcome).await.is_err() {
        tracing::warn!(terminal_id, "Failed to send welcome, disconnecting");
        cleanup(&state, terminal_id, connection_id).await;
        return;
    }

    // 连接建立前已创建的支付会话，直接补推
    for push in pending_requests(&state, terminal_id) {
        if send_json(&mut ws_sink, &push).await.is_err() {
            break;
        }
    }

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_device_message(&text, &state, &identity).await
                            && send_json(&mut ws_sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        state.connections.touch_heartbeat(terminal_id);
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(terminal_id, "Terminal WebSocket closed by device");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(terminal_id, "Terminal WebSocket error: {e}");
                        break;
                    }
                    _ => {}
                }
            }

            msg = msg_rx.recv() => {
                match msg {
                    Some(server_msg) => {
                        if send_json(&mut ws_sink, &server_msg).await.is_err() {
                            tracing::warn!(terminal_id, "Failed to push message to terminal");
                            break;
                        }
                    }
                    // replaced by a newer socket, evicted, or shutting down
                    None => break,
                }
            }
        }
    }

    let _ = ws_sink.close().await;
    cleanup(&state, terminal_id, connection_id).await;
}

/// `payment.request` for every session still pending for this terminal, oldest first
fn pending_requests(state: &ServerState, terminal_id: i64) -> Vec<ServerMessage> {
    let pending = state.payments.pending_for_terminal(state.store_id(), terminal_id);
    if !pending.is_empty() {
        tracing::info!(terminal_id, count = pending.len(), "Pushing pending payments on connect");
    }
    pending
        .iter()
        .map(|session| ServerMessage::PaymentRequest(PendingPayment::from(session)))
        .collect()
}

/// Unregister and go offline, unless a newer socket already took over
async fn cleanup(state: &ServerState, terminal_id: i64, connection_id: u64) {
    if !state.connections.unregister_if(terminal_id, connection_id) {
        tracing::debug!(terminal_id, connection_id, "Superseded connection closed");
        return;
    }
    if let Err(e) = state
        .terminals
        .update_terminal_status(terminal_id, TerminalStatus::Offline, None)
        .await
    {
        tracing::warn!(terminal_id, error = %e, "Failed to mark terminal offline");
    }
    tracing::info!(terminal_id, connection_id, "Terminal WebSocket session cleaned up");
}

async fn handle_device_message(
    text: &str,
    state: &ServerState,
    identity: &TerminalIdentity,
) -> Option<ServerMessage> {
    let terminal_id = identity.id();
    let msg: DeviceMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(terminal_id, "Invalid device message: {e}");
            return None;
        }
    };

    match msg {
        DeviceMessage::Heartbeat => {
            state.connections.touch_heartbeat(terminal_id);
            if let Err(e) = state
                .terminals
                .update_terminal_status(terminal_id, TerminalStatus::Online, identity.ip.as_deref())
                .await
            {
                tracing::warn!(terminal_id, error = %e, "Failed to record heartbeat");
            }
            Some(ServerMessage::HeartbeatAck {
                server_time: now_millis(),
            })
        }
        DeviceMessage::PaymentResult { payment_id, status } => {
            match state
                .payments
                .complete_payment(state.store_id(), terminal_id, &payment_id, status)
            {
                Ok(session) => {
                    tracing::info!(terminal_id, payment_id = %payment_id, status = %session.status, "Payment result accepted");
                }
                Err(e) => {
                    tracing::warn!(terminal_id, payment_id = %payment_id, error = %e, "Payment result rejected");
                }
            }
            None
        }
    }
}

async fn send_json<S>(sink: &mut S, msg: &ServerMessage) -> Result<(), axum::Error>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {e}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use shared::models::{PaymentCreate, PaymentStatus};

    use crate::core::Config;
    use crate::db::DbService;
    use crate::terminals::IdGenerator;

    const STORE: &str = "default-store";

    async fn paired_terminal() -> (ServerState, TerminalIdentity) {
        let db = DbService::in_memory().await.unwrap();
        let state = ServerState::with_db(Config::with_defaults(), db, Arc::new(IdGenerator::seeded(11)));
        let created = state.terminals.create_terminal(STORE, "Counter").await.unwrap();
        let identity = TerminalIdentity {
            terminal: created.terminal,
            ip: Some("10.0.0.5".into()),
        };
        (state, identity)
    }

    fn payment(state: &ServerState, terminal_id: i64, amount: i64, now: i64) -> String {
        let req = PaymentCreate {
            terminal_id,
            amount,
            currency: "CAD".into(),
            reference: String::new(),
        };
        state
            .payments
            .initiate_payment_at(STORE, &req, now)
            .unwrap()
            .payment_id
    }

    async fn status_of(state: &ServerState, terminal_id: i64) -> TerminalStatus {
        state
            .terminals
            .get_terminal(terminal_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_heartbeat_touches_registry_and_acks() {
        let (state, identity) = paired_terminal().await;
        let id = identity.id();
        let (tx, _rx) = mpsc::channel(4);
        state.connections.register_at(id, tx, 0);

        let reply = handle_device_message(r#"{"type":"heartbeat"}"#, &state, &identity).await;

        assert!(matches!(reply, Some(ServerMessage::HeartbeatAck { server_time }) if server_time > 0));
        assert!(state.connections.get(id).unwrap().last_heartbeat > 0);
        let terminal = state.terminals.get_terminal(id).await.unwrap().unwrap();
        assert_eq!(terminal.status, TerminalStatus::Online);
        assert_eq!(terminal.last_ip_address.as_deref(), Some("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_payment_result_completes_session() {
        let (state, identity) = paired_terminal().await;
        let payment_id = payment(&state, identity.id(), 1500, now_millis());

        let text = format!(r#"{{"type":"payment.result","paymentId":"{payment_id}","status":"approved"}}"#);
        assert!(handle_device_message(&text, &state, &identity).await.is_none());

        let session = state.payments.get_payment_status(STORE, &payment_id).unwrap();
        assert_eq!(session.status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_payment_result_for_other_terminal_is_ignored() {
        let (state, identity) = paired_terminal().await;
        let other = state.terminals.create_terminal(STORE, "Patio").await.unwrap();
        let payment_id = payment(&state, other.terminal.id, 900, now_millis());

        let text = format!(r#"{{"type":"payment.result","paymentId":"{payment_id}","status":"approved"}}"#);
        assert!(handle_device_message(&text, &state, &identity).await.is_none());

        let session = state.payments.get_payment_status(STORE, &payment_id).unwrap();
        assert_eq!(session.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_message_is_dropped() {
        let (state, identity) = paired_terminal().await;
        assert!(handle_device_message(r#"{"type":"reboot"}"#, &state, &identity).await.is_none());
        assert!(handle_device_message("not json", &state, &identity).await.is_none());
    }

    #[tokio::test]
    async fn test_superseded_socket_cleanup_keeps_successor() {
        let (state, identity) = paired_terminal().await;
        let id = identity.id();
        let (old_tx, _old_rx) = mpsc::channel(4);
        let (new_tx, _new_rx) = mpsc::channel(4);
        let old = state.connections.register(id, old_tx);
        let new = state.connections.register(id, new_tx);
        state
            .terminals
            .update_terminal_status(id, TerminalStatus::Online, None)
            .await
            .unwrap();

        cleanup(&state, id, old).await;
        assert!(state.connections.is_connected(id));
        assert_eq!(state.connections.get(id).unwrap().connection_id, new);
        assert_eq!(status_of(&state, id).await, TerminalStatus::Online);

        cleanup(&state, id, new).await;
        assert!(!state.connections.is_connected(id));
        assert_eq!(status_of(&state, id).await, TerminalStatus::Offline);
    }

    #[tokio::test]
    async fn test_pending_requests_on_connect() {
        let (state, identity) = paired_terminal().await;
        let id = identity.id();
        let other = state.terminals.create_terminal(STORE, "Patio").await.unwrap();
        let now = now_millis();
        let second = payment(&state, id, 200, now + 1);
        let first = payment(&state, id, 100, now);
        payment(&state, other.terminal.id, 300, now);
        let cancelled = payment(&state, id, 400, now + 2);
        state.payments.cancel_payment(STORE, &cancelled).unwrap();

        let ids: Vec<String> = pending_requests(&state, id)
            .into_iter()
            .map(|msg| match msg {
                ServerMessage::PaymentRequest(p) => p.payment_id,
                other => panic!("unexpected message: {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![first, second]);
    }
}

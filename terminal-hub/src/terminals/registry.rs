//! ConnectionRegistry - 在线终端连接表
//!
//! terminal_id → live WebSocket sender. Process local: a terminal connected
//! to another hub instance is invisible here.
//!
//! ```text
//! WS handler ──register──► ConnectionRegistry ◄──send── Dispatcher
//!      │                        │
//!      └──unregister_if(conn)───┘   (stale socket never removes its successor)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use shared::terminal::ServerMessage;
use shared::util::now_millis;
use tokio::sync::mpsc;

/// Outbound queue depth per device
pub const CONNECTION_CHANNEL_CAPACITY: usize = 64;

/// One live device channel
#[derive(Debug, Clone)]
pub struct Connection {
    pub terminal_id: i64,
    /// Distinguishes successive sockets of the same terminal
    pub connection_id: u64,
    pub sender: mpsc::Sender<ServerMessage>,
    pub connected_at: i64,
    pub last_heartbeat: i64,
}

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<i64, Connection>>,
    next_connection_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel for `terminal_id`, replacing any previous one.
    /// Returns the id of the new connection.
    pub fn register(&self, terminal_id: i64, sender: mpsc::Sender<ServerMessage>) -> u64 {
        self.register_at(terminal_id, sender, now_millis())
    }

    pub fn register_at(&self, terminal_id: i64, sender: mpsc::Sender<ServerMessage>, now: i64) -> u64 {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.connections.insert(
            terminal_id,
            Connection {
                terminal_id,
                connection_id,
                sender,
                connected_at: now,
                last_heartbeat: now,
            },
        );
        if let Some(old) = previous {
            // 旧连接的 sender 随 drop 关闭，其写任务自然退出
            tracing::info!(
                terminal_id = terminal_id,
                replaced = old.connection_id,
                connection_id = connection_id,
                "Terminal reconnected, previous channel replaced"
            );
        }
        connection_id
    }

    pub fn unregister(&self, terminal_id: i64) -> bool {
        self.connections.remove(&terminal_id).is_some()
    }

    /// Remove the entry only if it still belongs to `connection_id`
    pub fn unregister_if(&self, terminal_id: i64, connection_id: u64) -> bool {
        self.connections
            .remove_if(&terminal_id, |_, conn| conn.connection_id == connection_id)
            .is_some()
    }

    pub fn is_connected(&self, terminal_id: i64) -> bool {
        self.connections.contains_key(&terminal_id)
    }

    pub fn list_connected_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.connections.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of the current connection
    pub fn get(&self, terminal_id: i64) -> Option<Connection> {
        self.connections.get(&terminal_id).map(|c| c.clone())
    }

    pub fn touch_heartbeat(&self, terminal_id: i64) -> bool {
        self.touch_heartbeat_at(terminal_id, now_millis())
    }

    pub fn touch_heartbeat_at(&self, terminal_id: i64, now: i64) -> bool {
        match self.connections.get_mut(&terminal_id) {
            Some(mut conn) => {
                conn.last_heartbeat = now;
                true
            }
            None => false,
        }
    }

    /// Drop connections silent for longer than `timeout_ms`; returns their terminal ids
    pub fn evict_stale(&self, now: i64, timeout_ms: i64) -> Vec<i64> {
        let mut evicted = Vec::new();
        self.connections.retain(|id, conn| {
            let alive = now - conn.last_heartbeat <= timeout_ms;
            if !alive {
                evicted.push(*id);
            }
            alive
        });
        if !evicted.is_empty() {
            tracing::warn!(count = evicted.len(), terminals = ?evicted, "Evicted stale terminal connections");
        }
        evicted
    }

    /// Drop every channel (shutdown)
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

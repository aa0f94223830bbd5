use std::sync::Arc;

use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result};
use crate::db::DbService;
use crate::terminals::{
    ConnectionRegistry, Dispatcher, IdGenerator, PairingManager, PaymentSessionManager,
    TerminalService,
};

/// 服务器状态 - 持有所有服务的引用
///
/// Cloned into every handler; all members are cheap handles.
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置（不可变） |
/// | db | SQLite 连接池 |
/// | terminals | 终端记录 |
/// | pairing | 配对码 |
/// | connections | 在线设备连接（进程内） |
/// | payments | 支付会话（进程内） |
/// | dispatcher | 向设备推送消息 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub db: DbService,
    pub ids: Arc<IdGenerator>,
    pub terminals: TerminalService,
    pub pairing: PairingManager,
    pub connections: ConnectionRegistry,
    pub payments: PaymentSessionManager,
    pub dispatcher: Dispatcher,
}

impl ServerState {
    /// Open the database from config and build every service
    pub async fn initialize(config: &Config) -> Result<Self> {
        let db = DbService::new(&config.database_path).await?;
        Ok(Self::with_db(config.clone(), db, Arc::new(IdGenerator::new())))
    }

    /// Build on an existing database (tests use an in-memory one and a seeded generator)
    pub fn with_db(config: Config, db: DbService, ids: Arc<IdGenerator>) -> Self {
        let pairing = PairingManager::new(db.pool.clone(), ids.clone(), config.pairing_code_ttl_ms());
        let terminals = TerminalService::new(db.pool.clone(), ids.clone(), pairing.clone());
        let connections = ConnectionRegistry::new();
        let payments = PaymentSessionManager::new(
            ids.clone(),
            config.payment_session_ttl_ms(),
            &config.public_base_url,
        );
        let dispatcher = Dispatcher::new(connections.clone());

        Self {
            config: Arc::new(config),
            db,
            ids,
            terminals,
            pairing,
            connections,
            payments,
            dispatcher,
        }
    }

    pub fn store_id(&self) -> &str {
        &self.config.store_id
    }

    /// Register the periodic session sweep and stale connection eviction
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let state = self.clone();
        let period = std::time::Duration::from_secs(self.config.session_sweep_interval_secs);

        tasks.spawn_periodic("terminal_sweep", period, move || {
            let state = state.clone();
            async move { state.sweep().await }
        });
    }

    /// One sweep pass: expire overdue sessions, purge old finished ones,
    /// drop silent connections and mark those terminals offline
    pub async fn sweep(&self) {
        let now = shared::util::now_millis();

        let expired = self.payments.cleanup_expired_sessions_at(now);
        let purged = self
            .payments
            .purge_finished_at(now, crate::terminals::sessions::FINISHED_RETENTION_MS);
        if expired > 0 || purged > 0 {
            tracing::info!(expired = expired, purged = purged, "Payment session sweep");
        }

        let stale = self
            .connections
            .evict_stale(now, self.config.heartbeat_timeout());
        for terminal_id in stale {
            if let Err(e) = self
                .terminals
                .update_terminal_status(terminal_id, shared::models::TerminalStatus::Offline, None)
                .await
            {
                tracing::warn!(terminal_id = terminal_id, error = %e, "Failed to mark stale terminal offline");
            }
        }
    }

    /// Close every device channel (shutdown)
    pub fn close_connections(&self) {
        let closed = self.connections.close_all();
        if closed > 0 {
            tracing::info!(closed = closed, "Closed terminal connections");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{PaymentCreate, PaymentStatus, TerminalStatus};
    use tokio::sync::mpsc;

    async fn state() -> ServerState {
        let db = DbService::in_memory().await.unwrap();
        ServerState::with_db(Config::with_defaults(), db, Arc::new(IdGenerator::seeded(5)))
    }

    #[tokio::test]
    async fn test_sweep_evicts_silent_connection_and_marks_offline() {
        let state = state().await;
        let created = state
            .terminals
            .create_terminal(state.store_id(), "Bar")
            .await
            .unwrap();
        let id = created.terminal.id;
        state
            .terminals
            .update_terminal_status(id, TerminalStatus::Online, None)
            .await
            .unwrap();

        let (tx, _rx) = mpsc::channel(4);
        // last heartbeat far in the past
        state.connections.register_at(id, tx, 0);
        state.sweep().await;

        assert!(!state.connections.is_connected(id));
        let t = state.terminals.get_terminal(id).await.unwrap().unwrap();
        assert_eq!(t.status, TerminalStatus::Offline);
    }

    #[tokio::test]
    async fn test_sweep_expires_overdue_sessions() {
        let state = state().await;
        let req = PaymentCreate {
            terminal_id: 1,
            amount: 100,
            currency: "CAD".into(),
            reference: String::new(),
        };
        let old = state.payments.initiate_payment_at("default-store", &req, 0).unwrap();
        let fresh = state.payments.initiate_payment("default-store", &req).unwrap();

        state.sweep().await;

        let read = |id: &str| {
            state
                .payments
                .get_payment_status("default-store", id)
                .unwrap()
                .status
        };
        // flipped during this sweep, so still inside the retention window
        assert_eq!(read(&old.payment_id), PaymentStatus::Expired);
        assert_eq!(read(&fresh.payment_id), PaymentStatus::Pending);
    }
}

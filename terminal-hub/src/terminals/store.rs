//! Terminal Store
//!
//! Durable terminal records. Lookups return `Option`; only `delete_terminal`
//! treats absence as an error since it is an explicit, store-scoped action.

use std::sync::Arc;

use shared::models::{CreatedTerminal, Terminal, TerminalStatus};
use shared::util::now_millis;
use sqlx::SqlitePool;

use super::error::{Entity, TerminalError, TerminalResult};
use super::ids::IdGenerator;
use super::pairing::PairingManager;
use crate::db::repository::{RepoError, pairing_code, terminal};

const MAX_NAME_LEN: usize = 100;

#[derive(Clone, Debug)]
pub struct TerminalService {
    pool: SqlitePool,
    ids: Arc<IdGenerator>,
    pairing: PairingManager,
}

impl TerminalService {
    pub fn new(pool: SqlitePool, ids: Arc<IdGenerator>, pairing: PairingManager) -> Self {
        Self { pool, ids, pairing }
    }

    /// New terminal in `pairing` status together with its first pairing code
    pub async fn create_terminal(&self, store_id: &str, name: &str) -> TerminalResult<CreatedTerminal> {
        self.create_terminal_at(store_id, name, now_millis()).await
    }

    pub async fn create_terminal_at(
        &self,
        store_id: &str,
        name: &str,
        now: i64,
    ) -> TerminalResult<CreatedTerminal> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TerminalError::Validation("Terminal name is required".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(TerminalError::Validation(format!(
                "Terminal name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let record = Terminal {
            id: self.ids.record_id(),
            store_id: store_id.to_string(),
            name: name.to_string(),
            api_key: self.ids.api_key(),
            device_model: None,
            firmware_version: None,
            mac_address: None,
            status: TerminalStatus::Pairing,
            last_seen_at: None,
            last_ip_address: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        terminal::insert(&mut *tx, &record).await?;
        let code = self.pairing.issue_code(&mut *tx, &record, now).await?;
        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            store_id = %store_id,
            terminal_id = record.id,
            name = %record.name,
            "Terminal created"
        );
        Ok(CreatedTerminal {
            terminal: record,
            pairing_code: code,
        })
    }

    pub async fn get_terminal(&self, id: i64) -> TerminalResult<Option<Terminal>> {
        Ok(terminal::find_by_id(&self.pool, id).await?)
    }

    /// Same as [`get_terminal`](Self::get_terminal) but another store's
    /// terminal reads as absent
    pub async fn get_terminal_in_store(
        &self,
        store_id: &str,
        id: i64,
    ) -> TerminalResult<Option<Terminal>> {
        Ok(terminal::find_in_store(&self.pool, store_id, id).await?)
    }

    pub async fn get_terminal_by_api_key(&self, api_key: &str) -> TerminalResult<Option<Terminal>> {
        Ok(terminal::find_by_api_key(&self.pool, api_key).await?)
    }

    /// All terminals of a store, ordered by name
    pub async fn get_terminals(&self, store_id: &str) -> TerminalResult<Vec<Terminal>> {
        Ok(terminal::find_all_by_store(&self.pool, store_id).await?)
    }

    /// Remove a terminal and its pairing codes
    pub async fn delete_terminal(&self, store_id: &str, id: i64) -> TerminalResult<()> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        if terminal::find_in_store(&mut *tx, store_id, id).await?.is_none() {
            return Err(TerminalError::NotFound(Entity::Terminal));
        }
        let codes = pairing_code::delete_for_terminal(&mut *tx, id).await?;
        terminal::delete(&mut *tx, store_id, id).await?;

        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(store_id = %store_id, terminal_id = id, codes = codes, "Terminal deleted");
        Ok(())
    }

    /// Trusted internal status update (heartbeat, connect, disconnect).
    /// Any status may follow any other; returns `false` for an unknown id.
    pub async fn update_terminal_status(
        &self,
        id: i64,
        status: TerminalStatus,
        ip: Option<&str>,
    ) -> TerminalResult<bool> {
        let updated = terminal::update_status(&self.pool, id, status, ip, now_millis()).await?;
        if updated {
            tracing::debug!(terminal_id = id, status = %status, ip = ?ip, "Terminal status updated");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminals::ids::is_api_key;
    use shared::util::is_pairing_code;

    async fn service() -> TerminalService {
        let db = crate::db::DbService::in_memory().await.unwrap();
        let ids = Arc::new(IdGenerator::seeded(3));
        let pairing = PairingManager::new(db.pool.clone(), ids.clone(), 600_000);
        TerminalService::new(db.pool, ids, pairing)
    }

    #[tokio::test]
    async fn test_create_terminal_issues_key_and_code() {
        let svc = service().await;
        let created = svc.create_terminal_at("s1", "  Front  ", 5_000).await.unwrap();

        assert_eq!(created.terminal.name, "Front");
        assert_eq!(created.terminal.status, TerminalStatus::Pairing);
        assert!(is_api_key(&created.terminal.api_key));
        assert!(is_pairing_code(&created.pairing_code.code));
        assert_eq!(created.pairing_code.terminal_id, created.terminal.id);
        assert_eq!(created.pairing_code.expires_at, 5_000 + 600_000);

        let by_key = svc
            .get_terminal_by_api_key(&created.terminal.api_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, created.terminal.id);
    }

    #[tokio::test]
    async fn test_create_terminal_rejects_blank_name() {
        let svc = service().await;
        let err = svc.create_terminal("s1", "   ").await.unwrap_err();
        assert!(matches!(err, TerminalError::Validation(_)));
        assert!(svc.get_terminals("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookups_return_none_when_absent() {
        let svc = service().await;
        assert!(svc.get_terminal(1).await.unwrap().is_none());
        assert!(svc.get_terminal_by_api_key("tkey_x").await.unwrap().is_none());
        assert!(svc.get_terminals("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_terminals_ordered_by_name() {
        let svc = service().await;
        svc.create_terminal("s1", "Patio").await.unwrap();
        svc.create_terminal("s1", "Bar").await.unwrap();
        svc.create_terminal("s2", "Annex").await.unwrap();

        let names: Vec<_> = svc
            .get_terminals("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["Bar", "Patio"]);
    }

    #[tokio::test]
    async fn test_delete_terminal_is_store_scoped() {
        let svc = service().await;
        let created = svc.create_terminal("s1", "Bar").await.unwrap();
        let id = created.terminal.id;

        let err = svc.delete_terminal("s2", id).await.unwrap_err();
        assert!(matches!(err, TerminalError::NotFound(Entity::Terminal)));
        assert!(svc.get_terminal(id).await.unwrap().is_some());

        svc.delete_terminal("s1", id).await.unwrap();
        assert!(svc.get_terminal(id).await.unwrap().is_none());
        assert!(matches!(
            svc.delete_terminal("s1", id).await.unwrap_err(),
            TerminalError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_status_any_transition() {
        let svc = service().await;
        let id = svc.create_terminal("s1", "Bar").await.unwrap().terminal.id;

        assert!(svc
            .update_terminal_status(id, TerminalStatus::Online, Some("192.168.1.20"))
            .await
            .unwrap());
        // repeat is harmless
        assert!(svc
            .update_terminal_status(id, TerminalStatus::Online, Some("192.168.1.20"))
            .await
            .unwrap());
        assert!(svc
            .update_terminal_status(id, TerminalStatus::Pairing, None)
            .await
            .unwrap());

        let t = svc.get_terminal(id).await.unwrap().unwrap();
        assert_eq!(t.status, TerminalStatus::Pairing);
        assert_eq!(t.last_ip_address.as_deref(), Some("192.168.1.20"));
        assert!(t.last_seen_at.is_some());

        assert!(!svc
            .update_terminal_status(id + 1, TerminalStatus::Online, None)
            .await
            .unwrap());
    }
}

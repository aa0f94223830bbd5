//! Terminal Repository

use super::RepoResult;
use shared::models::{DeviceInfo, Terminal, TerminalStatus};
use sqlx::SqliteExecutor;

const COLUMNS: &str = "id, store_id, name, api_key, device_model, firmware_version, mac_address, status, last_seen_at, last_ip_address, created_at, updated_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(db: E, terminal: &Terminal) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO terminal (id, store_id, name, api_key, device_model, firmware_version, mac_address, status, last_seen_at, last_ip_address, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(terminal.id)
    .bind(&terminal.store_id)
    .bind(&terminal.name)
    .bind(&terminal.api_key)
    .bind(&terminal.device_model)
    .bind(&terminal.firmware_version)
    .bind(&terminal.mac_address)
    .bind(terminal.status)
    .bind(terminal.last_seen_at)
    .bind(&terminal.last_ip_address)
    .bind(terminal.created_at)
    .bind(terminal.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(db: E, id: i64) -> RepoResult<Option<Terminal>> {
    let terminal =
        sqlx::query_as::<_, Terminal>(&format!("SELECT {COLUMNS} FROM terminal WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(terminal)
}

/// Lookup restricted to one store; another store's terminal reads as absent
pub async fn find_in_store<'e, E: SqliteExecutor<'e>>(
    db: E,
    store_id: &str,
    id: i64,
) -> RepoResult<Option<Terminal>> {
    let terminal = sqlx::query_as::<_, Terminal>(&format!(
        "SELECT {COLUMNS} FROM terminal WHERE id = ? AND store_id = ?"
    ))
    .bind(id)
    .bind(store_id)
    .fetch_optional(db)
    .await?;
    Ok(terminal)
}

pub async fn find_by_api_key<'e, E: SqliteExecutor<'e>>(
    db: E,
    api_key: &str,
) -> RepoResult<Option<Terminal>> {
    let terminal =
        sqlx::query_as::<_, Terminal>(&format!("SELECT {COLUMNS} FROM terminal WHERE api_key = ?"))
            .bind(api_key)
            .fetch_optional(db)
            .await?;
    Ok(terminal)
}

pub async fn find_all_by_store<'e, E: SqliteExecutor<'e>>(
    db: E,
    store_id: &str,
) -> RepoResult<Vec<Terminal>> {
    let terminals = sqlx::query_as::<_, Terminal>(&format!(
        "SELECT {COLUMNS} FROM terminal WHERE store_id = ? ORDER BY name, id"
    ))
    .bind(store_id)
    .fetch_all(db)
    .await?;
    Ok(terminals)
}

/// Status change from a live signal (heartbeat, connect, disconnect):
/// also stamps `last_seen_at` and, when given, the caller IP.
pub async fn update_status<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: i64,
    status: TerminalStatus,
    ip: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE terminal SET status = ?1, last_seen_at = ?2, last_ip_address = COALESCE(?3, last_ip_address), updated_at = ?2 WHERE id = ?4",
    )
    .bind(status)
    .bind(now)
    .bind(ip)
    .bind(id)
    .execute(db)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Status change that is not a sign of life (e.g. back to `pairing`)
pub async fn set_status<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: i64,
    status: TerminalStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE terminal SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Record device details from a completed pairing; the terminal becomes `offline`
pub async fn apply_pairing<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: i64,
    device: &DeviceInfo,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE terminal SET device_model = ?1, firmware_version = ?2, mac_address = ?3, status = ?4, updated_at = ?5 WHERE id = ?6",
    )
    .bind(&device.model)
    .bind(&device.firmware_version)
    .bind(&device.mac_address)
    .bind(TerminalStatus::Offline)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete<'e, E: SqliteExecutor<'e>>(db: E, store_id: &str, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM terminal WHERE id = ? AND store_id = ?")
        .bind(id)
        .bind(store_id)
        .execute(db)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    fn terminal(id: i64, store_id: &str, name: &str, api_key: &str) -> Terminal {
        Terminal {
            id,
            store_id: store_id.into(),
            name: name.into(),
            api_key: api_key.into(),
            device_model: None,
            firmware_version: None,
            mac_address: None,
            status: TerminalStatus::Pairing,
            last_seen_at: None,
            last_ip_address: None,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, &terminal(1, "s1", "Bar", "tkey_a")).await.unwrap();

        let t = find_by_id(&db.pool, 1).await.unwrap().unwrap();
        assert_eq!(t.name, "Bar");
        assert_eq!(t.status, TerminalStatus::Pairing);

        let by_key = find_by_api_key(&db.pool, "tkey_a").await.unwrap().unwrap();
        assert_eq!(by_key.id, 1);
        assert!(find_by_api_key(&db.pool, "tkey_b").await.unwrap().is_none());
        assert!(find_by_id(&db.pool, 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_api_key_rejected() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, &terminal(1, "s1", "A", "tkey_same")).await.unwrap();
        let err = insert(&db.pool, &terminal(2, "s2", "B", "tkey_same"))
            .await
            .unwrap_err();
        assert!(matches!(err, super::super::RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_find_all_by_store_ordered_by_name() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, &terminal(1, "s1", "Patio", "tkey_1")).await.unwrap();
        insert(&db.pool, &terminal(2, "s1", "Bar", "tkey_2")).await.unwrap();
        insert(&db.pool, &terminal(3, "s2", "Annex", "tkey_3")).await.unwrap();

        let names: Vec<String> = find_all_by_store(&db.pool, "s1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Bar", "Patio"]);
    }

    #[tokio::test]
    async fn test_update_status_keeps_ip_when_absent() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, &terminal(1, "s1", "Bar", "tkey_1")).await.unwrap();

        update_status(&db.pool, 1, TerminalStatus::Online, Some("10.0.0.8"), 2000)
            .await
            .unwrap();
        update_status(&db.pool, 1, TerminalStatus::Offline, None, 3000)
            .await
            .unwrap();

        let t = find_by_id(&db.pool, 1).await.unwrap().unwrap();
        assert_eq!(t.status, TerminalStatus::Offline);
        assert_eq!(t.last_ip_address.as_deref(), Some("10.0.0.8"));
        assert_eq!(t.last_seen_at, Some(3000));
        assert!(!update_status(&db.pool, 42, TerminalStatus::Online, None, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_store_scoped() {
        let db = DbService::in_memory().await.unwrap();
        insert(&db.pool, &terminal(1, "s1", "Bar", "tkey_1")).await.unwrap();

        assert!(!delete(&db.pool, "s2", 1).await.unwrap());
        assert!(find_by_id(&db.pool, 1).await.unwrap().is_some());

        assert!(delete(&db.pool, "s1", 1).await.unwrap());
        assert!(find_by_id(&db.pool, 1).await.unwrap().is_none());
    }
}

//! Pairing Code Repository

use super::RepoResult;
use shared::models::PairingCode;
use sqlx::SqliteExecutor;

const COLUMNS: &str =
    "id, store_id, code, terminal_id, terminal_name, expires_at, used_at, created_at";

pub async fn insert<'e, E: SqliteExecutor<'e>>(db: E, code: &PairingCode) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO pairing_code (id, store_id, code, terminal_id, terminal_name, expires_at, used_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(code.id)
    .bind(&code.store_id)
    .bind(&code.code)
    .bind(code.terminal_id)
    .bind(&code.terminal_name)
    .bind(code.expires_at)
    .bind(code.used_at)
    .bind(code.created_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Unused, unexpired code with this value in this store (newest first)
pub async fn find_redeemable<'e, E: SqliteExecutor<'e>>(
    db: E,
    store_id: &str,
    code: &str,
    now: i64,
) -> RepoResult<Option<PairingCode>> {
    let found = sqlx::query_as::<_, PairingCode>(&format!(
        "SELECT {COLUMNS} FROM pairing_code WHERE store_id = ? AND code = ? AND used_at IS NULL AND expires_at >= ? ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(store_id)
    .bind(code)
    .bind(now)
    .fetch_optional(db)
    .await?;
    Ok(found)
}

/// Outstanding codes for one terminal
pub async fn find_outstanding_for_terminal<'e, E: SqliteExecutor<'e>>(
    db: E,
    terminal_id: i64,
    now: i64,
) -> RepoResult<Vec<PairingCode>> {
    let codes = sqlx::query_as::<_, PairingCode>(&format!(
        "SELECT {COLUMNS} FROM pairing_code WHERE terminal_id = ? AND used_at IS NULL AND expires_at >= ? ORDER BY created_at"
    ))
    .bind(terminal_id)
    .bind(now)
    .fetch_all(db)
    .await?;
    Ok(codes)
}

/// Consume a code. Returns `false` when someone else already consumed it.
pub async fn mark_used<'e, E: SqliteExecutor<'e>>(db: E, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE pairing_code SET used_at = ? WHERE id = ? AND used_at IS NULL")
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// Mark every not-yet-used code of a terminal as used
pub async fn invalidate_for_terminal<'e, E: SqliteExecutor<'e>>(
    db: E,
    terminal_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE pairing_code SET used_at = ? WHERE terminal_id = ? AND used_at IS NULL",
    )
    .bind(now)
    .bind(terminal_id)
    .execute(db)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn delete_for_terminal<'e, E: SqliteExecutor<'e>>(
    db: E,
    terminal_id: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM pairing_code WHERE terminal_id = ?")
        .bind(terminal_id)
        .execute(db)
        .await?;
    Ok(rows.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::terminal;
    use shared::models::{Terminal, TerminalStatus};

    async fn test_db() -> DbService {
        let db = DbService::in_memory().await.unwrap();
        for (id, store) in [(1, "s1"), (2, "s2")] {
            terminal::insert(
                &db.pool,
                &Terminal {
                    id,
                    store_id: store.into(),
                    name: format!("T{id}"),
                    api_key: format!("tkey_{id}"),
                    device_model: None,
                    firmware_version: None,
                    mac_address: None,
                    status: TerminalStatus::Pairing,
                    last_seen_at: None,
                    last_ip_address: None,
                    created_at: 0,
                    updated_at: 0,
                },
            )
            .await
            .unwrap();
        }
        db
    }

    fn code(id: i64, store_id: &str, terminal_id: i64, value: &str, expires_at: i64) -> PairingCode {
        PairingCode {
            id,
            store_id: store_id.into(),
            code: value.into(),
            terminal_id,
            terminal_name: format!("T{terminal_id}"),
            expires_at,
            used_at: None,
            created_at: id,
        }
    }

    #[tokio::test]
    async fn test_find_redeemable_respects_store_and_expiry() {
        let db = test_db().await;
        insert(&db.pool, &code(10, "s1", 1, "123456", 5_000)).await.unwrap();

        assert!(find_redeemable(&db.pool, "s1", "123456", 1_000).await.unwrap().is_some());
        assert!(find_redeemable(&db.pool, "s2", "123456", 1_000).await.unwrap().is_none());
        assert!(find_redeemable(&db.pool, "s1", "654321", 1_000).await.unwrap().is_none());
        // live through expires_at, gone one ms later
        assert!(find_redeemable(&db.pool, "s1", "123456", 5_000).await.unwrap().is_some());
        assert!(find_redeemable(&db.pool, "s1", "123456", 5_001).await.unwrap().is_none());
        assert_eq!(find_outstanding_for_terminal(&db.pool, 1, 5_000).await.unwrap().len(), 1);
        assert!(find_outstanding_for_terminal(&db.pool, 1, 5_001).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_used_only_once() {
        let db = test_db().await;
        insert(&db.pool, &code(10, "s1", 1, "123456", 5_000)).await.unwrap();

        assert!(mark_used(&db.pool, 10, 1_000).await.unwrap());
        assert!(!mark_used(&db.pool, 10, 1_001).await.unwrap());
        assert!(find_redeemable(&db.pool, "s1", "123456", 1_002).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_for_terminal() {
        let db = test_db().await;
        insert(&db.pool, &code(10, "s1", 1, "111111", 5_000)).await.unwrap();
        insert(&db.pool, &code(11, "s1", 1, "222222", 5_000)).await.unwrap();
        insert(&db.pool, &code(12, "s2", 2, "333333", 5_000)).await.unwrap();

        assert_eq!(invalidate_for_terminal(&db.pool, 1, 100).await.unwrap(), 2);
        assert!(find_outstanding_for_terminal(&db.pool, 1, 100).await.unwrap().is_empty());
        assert_eq!(find_outstanding_for_terminal(&db.pool, 2, 100).await.unwrap().len(), 1);
        // second run has nothing left to touch
        assert_eq!(invalidate_for_terminal(&db.pool, 1, 200).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_for_terminal() {
        let db = test_db().await;
        insert(&db.pool, &code(10, "s1", 1, "111111", 5_000)).await.unwrap();
        insert(&db.pool, &code(11, "s1", 1, "222222", 5_000)).await.unwrap();

        assert_eq!(delete_for_terminal(&db.pool, 1).await.unwrap(), 2);
        assert_eq!(delete_for_terminal(&db.pool, 1).await.unwrap(), 0);
    }
}

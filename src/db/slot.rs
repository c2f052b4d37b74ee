use anyhow::Result;
use sqlx::{query, query_as, sqlite::SqlitePool};

/// Named string slots in the `local_storage` table.
///
/// Every write replaces the whole value; concurrent writers race and the last
/// one wins.
#[derive(Clone)]
pub struct SlotStore {
    pool: SqlitePool,
}

impl SlotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = query_as(r#"SELECT value FROM local_storage WHERE key = ?1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        query(
            r#"INSERT OR REPLACE INTO local_storage (key, value, updated_at)
                VALUES (?1, ?2, CURRENT_TIMESTAMP)"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        let affected = query(r#"DELETE FROM local_storage WHERE key = ?1"#)
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

use std::collections::HashMap;

use anyhow::Result;

use super::schema::Database;
use super::types::StoredValue;

impl Database {
    // ========================================================================
    // Key-Value Operations
    // ========================================================================

    /// Get the decoded value stored under `key`, or `None` if not set.
    pub async fn get_value(&self, key: &str) -> Result<Option<StoredValue>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(raw,)| StoredValue::decode(&raw)))
    }

    /// Get a string value. A key holding a non-string value reads as unset.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.get_value(key).await? {
            Some(StoredValue::Text(s)) => Some(s),
            _ => None,
        })
    }

    /// Set a string value (UPSERT). Overwrites whatever was stored under `key`.
    pub async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.upsert_raw(key, &encoded).await
    }

    /// Set a boolean value (UPSERT).
    pub async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.upsert_raw(key, if value { "true" } else { "false" })
            .await
    }

    /// Read a boolean value; missing or non-boolean values are `false`.
    pub async fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(self
            .get_value(key)
            .await?
            .is_some_and(|value| value.as_flag()))
    }

    /// Negate the boolean under `key` and return the new value.
    ///
    /// A missing or non-boolean value counts as `false`, so the first toggle
    /// always stores `true`. Runs as a single statement.
    pub async fn toggle_flag(&self, key: &str) -> Result<bool> {
        let (value,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, 'true', datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = CASE WHEN kv_store.value = 'true' THEN 'false' ELSE 'true' END,
                updated_at = excluded.updated_at
            RETURNING value
        "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        self.notify_changed();
        Ok(value == "true")
    }

    /// Every stored key mapped to its boolean reading.
    ///
    /// Non-boolean values (including the user-topic document) map to `false`.
    pub async fn all_flags(&self) -> Result<HashMap<String, bool>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM kv_store")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(key, raw)| (key, StoredValue::decode(&raw).as_flag()))
            .collect())
    }

    async fn upsert_raw(&self, key: &str, encoded: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(encoded)
        .execute(&self.pool)
        .await?;

        self.notify_changed();
        Ok(())
    }
}

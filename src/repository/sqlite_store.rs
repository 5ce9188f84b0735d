// ==========================================
// CRM 批量导入引擎 - SQLite Record Store
// ==========================================
// 存储: record 表 (table_name + record_id + fields_json)
// 约束: 所有查询使用参数化；字段匹配使用 json_extract
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::record::{Record, RecordFields};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 打开数据库文件并建表（幂等）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 复用已有连接（与 ConfigManager / 审计日志共享）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

/// record 表原始行
struct RawRecord {
    id: String,
    fields_json: String,
    created_at: String,
    updated_at: String,
}

impl RawRecord {
    fn into_record(self) -> RepositoryResult<Record> {
        let fields: RecordFields = serde_json::from_str(&self.fields_json)?;
        Ok(Record {
            id: self.id,
            fields,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn parse_ts(raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: "created_at/updated_at".to_string(),
            message: format!("{}: {}", raw, e),
        })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_matching(
        &self,
        table: &str,
        criteria: &[(&str, &str)],
    ) -> RepositoryResult<Option<Record>> {
        let mut sql = String::from(
            "SELECT record_id, fields_json, created_at, updated_at FROM record WHERE table_name = ?1",
        );
        let mut bind: Vec<String> = vec![table.to_string()];
        for (field, value) in criteria {
            let path_idx = bind.len() + 1;
            // 布尔值按 "true"/"false" 比较，与 Record::field_str 一致
            sql.push_str(&format!(
                " AND CASE json_type(fields_json, '$.\"' || ?{p} || '\"') \
                 WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
                 ELSE CAST(json_extract(fields_json, '$.\"' || ?{p} || '\"') AS TEXT) END = ?{v}",
                p = path_idx,
                v = path_idx + 1
            ));
            bind.push(field.to_string());
            bind.push(value.to_string());
        }
        sql.push_str(" ORDER BY created_at, rowid LIMIT 1");

        let raw = {
            let conn = self.get_conn()?;
            conn.query_row(&sql, params_from_iter(bind.iter()), |row| {
                Ok(RawRecord {
                    id: row.get(0)?,
                    fields_json: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })
            .optional()?
        };

        raw.map(RawRecord::into_record).transpose()
    }

    async fn insert(&self, table: &str, fields: RecordFields) -> RepositoryResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let fields_json = serde_json::to_string(&fields)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO record (table_name, record_id, fields_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![table, id, fields_json, now],
        )?;
        Ok(id)
    }

    async fn update(&self, table: &str, id: &str, fields: RecordFields) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT fields_json FROM record WHERE table_name = ?1 AND record_id = ?2",
                params![table, id],
                |row| row.get(0),
            )
            .optional()?;
        let existing = existing.ok_or_else(|| RepositoryError::NotFound {
            entity: table.to_string(),
            id: id.to_string(),
        })?;

        let mut merged: RecordFields = serde_json::from_str(&existing)?;
        merged.extend(fields);

        tx.execute(
            "UPDATE record SET fields_json = ?3, updated_at = ?4 WHERE table_name = ?1 AND record_id = ?2",
            params![
                table,
                id,
                serde_json::to_string(&merged)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM record WHERE table_name = ?1 AND record_id = ?2",
            params![table, id],
        )?;
        Ok(rows > 0)
    }

    async fn count(&self, table: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record WHERE table_name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteRecordStore {
        let conn = Connection::open_in_memory().unwrap();
        SqliteRecordStore::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn fields(value: serde_json::Value) -> RecordFields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip_and_merge_update() {
        let store = store();
        let id = store
            .insert("accounts", fields(json!({"name": "Acme", "employee_count": 42})))
            .await
            .unwrap();

        let found = store
            .find_one("accounts", "employee_count", "42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);

        store
            .update("accounts", &id, fields(json!({"industry": "Retail"})))
            .await
            .unwrap();
        let record = store.find_one("accounts", "name", "Acme").await.unwrap().unwrap();
        assert!(record.field_matches("industry", "Retail"));
        assert!(record.field_matches("employee_count", "42"));
    }

    #[tokio::test]
    async fn test_tables_are_isolated() {
        let store = store();
        store
            .insert("accounts", fields(json!({"name": "Acme"})))
            .await
            .unwrap();

        assert!(store.find_one("jobs", "name", "Acme").await.unwrap().is_none());
        assert_eq!(store.count("accounts").await.unwrap(), 1);
        assert_eq!(store.count("jobs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_matching_and_delete() {
        let store = store();
        let id = store
            .insert("jobs", fields(json!({"name": "Redesign", "account_id": "a1"})))
            .await
            .unwrap();

        let miss = store
            .find_matching("jobs", &[("name", "Redesign"), ("account_id", "a2")])
            .await
            .unwrap();
        assert!(miss.is_none());

        assert!(store.delete("jobs", &id).await.unwrap());
        assert!(store
            .find_matching("jobs", &[("name", "Redesign"), ("account_id", "a1")])
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_boolean_fields_match_as_text() {
        let store = store();
        let id = store
            .insert(
                "jobs",
                fields(json!({"name": "Redesign", "new_business": true, "archived": false})),
            )
            .await
            .unwrap();

        let hit = store
            .find_matching("jobs", &[("new_business", "true"), ("archived", "false")])
            .await
            .unwrap();
        assert_eq!(hit.map(|r| r.id), Some(id));

        assert!(store.find_one("jobs", "new_business", "1").await.unwrap().is_none());
        assert!(store.find_one("jobs", "archived", "0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_persist_across_reopen() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_string_lossy().to_string();

        let id = SqliteRecordStore::new(&db_path)
            .unwrap()
            .insert("accounts", fields(json!({"name": "Acme"})))
            .await
            .unwrap();

        let reopened = SqliteRecordStore::new(&db_path).unwrap();
        let found = reopened.find_one("accounts", "name", "Acme").await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(id));
    }

    #[tokio::test]
    async fn test_unopenable_path_is_connection_error() {
        let missing_dir = tempfile::tempdir().unwrap().path().join("missing");
        let db_path = missing_dir.join("crm.db").to_string_lossy().to_string();

        assert!(matches!(
            SqliteRecordStore::new(&db_path),
            Err(RepositoryError::DatabaseConnectionError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let store = store();
        let result = store.update("jobs", "missing", RecordFields::new()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }
}

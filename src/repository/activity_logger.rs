// ==========================================
// CRM 批量导入引擎 - 审计日志
// ==========================================
// 职责: 追加导入审计事件
// 实现: TracingActivityLogger（仅日志输出）, SqliteActivityLogger（action_log 表）
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::activity::ActivityEvent;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

// ==========================================
// ActivityLogger Trait
// ==========================================
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    /// 追加一条审计事件
    async fn log(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        details: JsonValue,
    ) -> RepositoryResult<()>;
}

// ==========================================
// TracingActivityLogger - 仅输出到 tracing
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityLogger;

#[async_trait]
impl ActivityLogger for TracingActivityLogger {
    async fn log(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        details: JsonValue,
    ) -> RepositoryResult<()> {
        info!(
            entity_type = %entity_type,
            entity_id = %entity_id,
            action = %action,
            details = %details,
            "审计事件"
        );
        Ok(())
    }
}

// ==========================================
// SqliteActivityLogger - 写入 action_log 表
// ==========================================
pub struct SqliteActivityLogger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteActivityLogger {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入审计事件，返回 action_id
    pub fn insert(&self, event: &ActivityEvent) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, entity_type, entity_id, action, details_json, action_ts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                event.action_id,
                event.entity_type,
                event.entity_id,
                event.action,
                event.details.to_string(),
                event.action_ts.to_rfc3339(),
            ],
        )?;
        Ok(event.action_id.clone())
    }

    /// 按时间倒序读取最近的审计事件
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ActivityEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, entity_type, entity_id, action, details_json, action_ts
            FROM action_log
            ORDER BY action_ts DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (action_id, entity_type, entity_id, action, details_json, action_ts) = row?;
            let details = match details_json {
                Some(raw) => serde_json::from_str(&raw)?,
                None => JsonValue::Null,
            };
            let action_ts = DateTime::parse_from_rfc3339(&action_ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "action_ts".to_string(),
                    message: e.to_string(),
                })?;
            events.push(ActivityEvent {
                action_id,
                entity_type,
                entity_id,
                action,
                details,
                action_ts,
            });
        }
        Ok(events)
    }
}

#[async_trait]
impl ActivityLogger for SqliteActivityLogger {
    async fn log(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        details: JsonValue,
    ) -> RepositoryResult<()> {
        let event = ActivityEvent::new(entity_type, entity_id, action, details);
        self.insert(&event)?;
        Ok(())
    }
}

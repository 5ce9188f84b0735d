// ==========================================
// CRM 批量导入引擎 - 内存 Record Store
// ==========================================
// 用途: 测试、预演导入、嵌入场景
// 约束: 可为表声明唯一字段，插入/更新时检查
// ==========================================

use crate::domain::record::{Record, RecordFields};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    unique_fields: HashMap<String, Vec<String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明唯一字段（同表内该字段的非空值不得重复）
    pub fn with_unique_field(mut self, table: &str, field: &str) -> Self {
        self.unique_fields
            .entry(table.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    /// 读取表内全部记录（按插入顺序）
    pub fn records(&self, table: &str) -> RepositoryResult<Vec<Record>> {
        Ok(self.lock()?.get(table).cloned().unwrap_or_default())
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, HashMap<String, Vec<Record>>>> {
        self.tables
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn check_unique(
        &self,
        table: &str,
        records: &[Record],
        fields: &RecordFields,
        exclude_id: Option<&str>,
    ) -> RepositoryResult<()> {
        let Some(unique) = self.unique_fields.get(table) else {
            return Ok(());
        };

        for field in unique {
            let Some(value) = fields.get(field).and_then(|v| v.as_str()) else {
                continue;
            };
            let clash = records
                .iter()
                .filter(|r| Some(r.id.as_str()) != exclude_id)
                .any(|r| r.field_matches(field, value));
            if clash {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "{}.{} = {}",
                    table, field, value
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_matching(
        &self,
        table: &str,
        criteria: &[(&str, &str)],
    ) -> RepositoryResult<Option<Record>> {
        let tables = self.lock()?;
        Ok(tables.get(table).and_then(|records| {
            records
                .iter()
                .find(|r| criteria.iter().all(|(f, v)| r.field_matches(f, v)))
                .cloned()
        }))
    }

    async fn insert(&self, table: &str, fields: RecordFields) -> RepositoryResult<String> {
        let mut tables = self.lock()?;
        let records = tables.entry(table.to_string()).or_default();
        self.check_unique(table, records, &fields, None)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        records.push(Record {
            id: id.clone(),
            fields,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update(&self, table: &str, id: &str, fields: RecordFields) -> RepositoryResult<()> {
        let mut tables = self.lock()?;
        let records = tables.entry(table.to_string()).or_default();
        self.check_unique(table, records, &fields, Some(id))?;

        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: table.to_string(),
                id: id.to_string(),
            })?;

        record.fields.extend(fields);
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> RepositoryResult<bool> {
        let mut tables = self.lock()?;
        let Some(records) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn count(&self, table: &str) -> RepositoryResult<usize> {
        Ok(self.lock()?.get(table).map(Vec::len).unwrap_or(0))
    }
}

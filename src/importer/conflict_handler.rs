// ==========================================
// CRM 批量导入引擎 - 冲突处理器实现
// ==========================================
// 职责: 重复策略决策 / 文件内重复检测 / 主键级互斥锁
// 红线: 同一 (表, 主键) 的 "查找 → 插入" 必须串行，防止并发重复插入
// ==========================================

use crate::domain::record::Record;
use crate::domain::row::Row;
use crate::domain::schema::ImportSchema;
use crate::domain::types::{DuplicateStrategy, EntityKind};
use crate::importer::error::{EngineResult, ImportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// 锁表超过该规模时清理空闲条目
const LOCK_PRUNE_THRESHOLD: usize = 1024;

// ==========================================
// DuplicateAction - 重复策略决策结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateAction {
    Insert,
    Skip,
    Update(String), // 已存在记录 ID
    Reject,
}

/// 根据重复策略与已存在记录决定处理方式
pub fn decide(strategy: DuplicateStrategy, existing: Option<&Record>) -> DuplicateAction {
    match (existing, strategy) {
        (None, _) => DuplicateAction::Insert,
        (Some(_), DuplicateStrategy::Skip) => DuplicateAction::Skip,
        (Some(record), DuplicateStrategy::Update) => DuplicateAction::Update(record.id.clone()),
        (Some(_), DuplicateStrategy::Error) => DuplicateAction::Reject,
    }
}

/// 行的业务主键（项目为 名称 + 客户名称；主键为空返回 None）
pub fn natural_key(schema: &ImportSchema, row: &Row) -> Option<String> {
    let key = row.non_empty(&schema.key_field)?;
    match schema.entity {
        EntityKind::Job => {
            let client = row.non_empty("client_name")?;
            Some(format!("{}\u{1f}{}", key, client))
        }
        _ => Some(key.to_string()),
    }
}

// ==========================================
// DuplicateTracker - 文件内重复检测
// ==========================================
// 首次出现的行不算重复；后续出现返回首次出现的行号
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    first_occurrence: HashMap<String, usize>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记主键
    ///
    /// # 返回
    /// - Some(first_row): 与之前某行重复
    /// - None: 首次出现
    pub fn observe(&mut self, key: String, row_number: usize) -> Option<usize> {
        match self.first_occurrence.get(&key) {
            Some(first_row) => Some(*first_row),
            None => {
                self.first_occurrence.insert(key, row_number);
                None
            }
        }
    }
}

// ==========================================
// KeyLocks - 主键级异步互斥锁
// ==========================================
// 同一执行器上的所有导入共享；不同主键互不阻塞
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 (表, 主键) 锁，守卫释放即解锁
    pub async fn acquire(&self, table: &str, key: &str) -> EngineResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁表获取失败: {}", e)))?;

            if locks.len() > LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            locks
                .entry((table.to_string(), key.to_string()))
                .or_default()
                .clone()
        };

        Ok(lock.lock_owned().await)
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// CRM 批量导入引擎 - Record Store Trait
// ==========================================
// 职责: 定义导入引擎依赖的记录存储接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::record::{Record, RecordFields};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// RecordStore Trait
// ==========================================
// 实现者: InMemoryRecordStore, SqliteRecordStore
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 按单个字段查找第一条匹配记录
    ///
    /// # 返回
    /// - Ok(Some(record)): 找到
    /// - Ok(None): 不存在
    async fn find_one(
        &self,
        table: &str,
        field: &str,
        value: &str,
    ) -> RepositoryResult<Option<Record>> {
        self.find_matching(table, &[(field, value)]).await
    }

    /// 按多个字段（全部相等）查找第一条匹配记录
    async fn find_matching(
        &self,
        table: &str,
        criteria: &[(&str, &str)],
    ) -> RepositoryResult<Option<Record>>;

    /// 插入记录，返回新记录 ID
    async fn insert(&self, table: &str, fields: RecordFields) -> RepositoryResult<String>;

    /// 将给定字段合并到已有记录
    ///
    /// # 错误
    /// - RepositoryError::NotFound: 记录不存在
    async fn update(&self, table: &str, id: &str, fields: RecordFields) -> RepositoryResult<()>;

    /// 删除记录
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 记录不存在
    async fn delete(&self, table: &str, id: &str) -> RepositoryResult<bool>;

    /// 统计表内记录数
    async fn count(&self, table: &str) -> RepositoryResult<usize>;
}

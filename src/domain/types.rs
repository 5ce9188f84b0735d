// ==========================================
// CRM 批量导入引擎 - 领域类型定义
// ==========================================
// 职责: 实体类别、重复策略等基础枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 目标实体类别 (Entity Kind)
// ==========================================
// 决定导入执行器的落库分派方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account, // 客户（按名称唯一）
    Job,     // 项目（按 名称+客户ID 唯一，依赖客户）
    User,    // 用户（按邮箱唯一）
    Generic, // 宿主应用自行注册的实体（按 schema 主键字段唯一）
}

impl EntityKind {
    /// 启发式表中使用的实体键
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "accounts",
            EntityKind::Job => "jobs",
            EntityKind::User => "users",
            EntityKind::Generic => "generic",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 重复策略 (Duplicate Strategy)
// ==========================================
// 主键已存在时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    Skip,   // 保持原记录不变
    Update, // 将非空字段合并到原记录
    Error,  // 记为行级错误
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateStrategy::Skip => write!(f, "skip"),
            DuplicateStrategy::Update => write!(f, "update"),
            DuplicateStrategy::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_strategy_serde() {
        let json = serde_json::to_string(&DuplicateStrategy::Update).unwrap();
        assert_eq!(json, "\"update\"");

        let parsed: DuplicateStrategy = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(parsed, DuplicateStrategy::Error);
    }

    #[test]
    fn test_entity_kind_key() {
        assert_eq!(EntityKind::Account.as_str(), "accounts");
        assert_eq!(EntityKind::Job.to_string(), "jobs");
    }
}

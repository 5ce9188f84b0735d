// ==========================================
// CRM 批量导入引擎 - 存储记录模型
// ==========================================
// 职责: Record Store 读写的记录结构
// 红线: 引擎只依赖字段名，不假设存储内部结构
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 记录字段集合（字段名 → JSON 值）
pub type RecordFields = Map<String, JsonValue>;

// ==========================================
// Record - 存储中的一条记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub fields: RecordFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// 以字符串形式读取字段（数字/布尔转为文本，null 视为缺失）
    pub fn field_str(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// 判断字段是否等于给定文本
    pub fn field_matches(&self, field: &str, value: &str) -> bool {
        self.field_str(field).as_deref() == Some(value)
    }
}

// ==========================================
// CRM 批量导入引擎 - 审计事件模型
// ==========================================
// 用途: Activity Logger 追加的审计事件
// 对齐: action_log 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub action_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub details: JsonValue,
    pub action_ts: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(entity_type: &str, entity_id: &str, action: &str, details: JsonValue) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            details,
            action_ts: Utc::now(),
        }
    }
}

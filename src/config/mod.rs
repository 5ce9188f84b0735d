// ==========================================
// CRM 批量导入引擎 - 配置层
// ==========================================
// 职责: 导入配置读取、启发式映射表、配置快照
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod heuristics;
pub mod import_config_trait;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use heuristics::{HeuristicTables, IndustryGroup, JobDefaults, KeywordGroup};
pub use import_config_trait::{ImportConfigReader, ImportSettings, StaticConfig};

// ==========================================
// CRM 批量导入引擎 - 核心库
// ==========================================
// 职责: 外部表格文件的校验、标准化、依赖解析、重复处理与分批落库
// 技术栈: Rust + SQLite
// 外部协作方: Record Store（记录存储）, Activity Logger（审计日志）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - Schema / 行 / 记录 / 报告
pub mod domain;

// 数据仓储层 - 记录存储与审计日志
pub mod repository;

// 导入层 - 解析、校验、转换、执行
pub mod importer;

// 配置层 - 导入配置与启发式表
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    DuplicateStrategy, EntityKind, ImportResult, ImportSchema, ImportSummary, Row, RowIssue,
    Transform, ValidationRule,
};

// 导入器
pub use importer::{BulkImporter, BulkImporterImpl, EngineResult, ImportError, SchemaRegistry};

// 存储
pub use repository::{ActivityLogger, InMemoryRecordStore, RecordStore, SqliteRecordStore};

// 配置
pub use config::{ConfigManager, HeuristicTables, ImportConfigReader, ImportSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "CRM 批量导入引擎";

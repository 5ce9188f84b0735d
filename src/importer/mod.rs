// ==========================================
// CRM 批量导入引擎 - 导入层
// ==========================================
// 职责: 外部表格文件 → 校验 / 标准化 → 分批落库 → 逐行报告
// 流程: 解析 → 转换 → 校验 → 冲突处理 → 落库 → 汇总
// ==========================================

// 模块声明
pub mod bulk_importer;
pub mod conflict_handler;
pub mod derivation;
pub mod error;
pub mod field_validator;
pub mod file_parser;
pub mod import_executor;
pub mod import_trait;
pub mod row_transformer;
pub mod schema_registry;
pub mod schemas;
pub mod template;
pub mod transforms;
pub mod validation_pass;

// 重导出核心类型
pub use bulk_importer::BulkImporterImpl;
pub use conflict_handler::{DuplicateAction, DuplicateTracker, KeyLocks};
pub use error::{EngineResult, ImportError};
pub use field_validator::RuleValidator;
pub use file_parser::CsvParser;
pub use import_executor::ImportExecutor;
pub use row_transformer::SchemaRowTransformer;
pub use schema_registry::SchemaRegistry;
pub use template::generate_template;
pub use validation_pass::{CheckedRow, ValidationPass};

// 重导出 Trait 接口
pub use import_trait::{BulkImporter, FieldValidator, FileParser, RowTransformer, TransformedRow};

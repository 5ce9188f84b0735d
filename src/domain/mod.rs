// ==========================================
// CRM 批量导入引擎 - 领域模型层
// ==========================================
// 职责: 定义 Schema、行、记录、报告等领域类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod activity;
pub mod record;
pub mod report;
pub mod row;
pub mod schema;
pub mod types;

// 重导出核心类型
pub use activity::ActivityEvent;
pub use record::{Record, RecordFields};
pub use report::{
    display_row_number, BatchOutcome, ImportResult, ImportSummary, RowDisposition, RowIssue,
};
pub use row::Row;
pub use schema::{
    ColumnSpec, ImportSchema, ImportSchemaBuilder, RuleKind, Transform, TransformFn,
    ValidationRule,
};
pub use types::{DuplicateStrategy, EntityKind};

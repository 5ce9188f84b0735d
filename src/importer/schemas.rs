// ==========================================
// CRM 批量导入引擎 - 内置导入 Schema
// ==========================================
// 职责: 客户 (accounts) / 项目 (jobs) / 用户 (users) 三个内置 schema
// 约束: 进程启动时构建一次；宿主应用可另行注册自定义 schema
// ==========================================

use crate::domain::schema::{ColumnSpec, ImportSchema, Transform, ValidationRule};
use crate::domain::types::{DuplicateStrategy, EntityKind};
use crate::importer::error::EngineResult;

pub const ACCOUNTS: &str = "accounts";
pub const JOBS: &str = "jobs";
pub const USERS: &str = "users";

const PHONE_PATTERN: &str = r"^[+()0-9\s./-]{6,24}$";
const SHORT_CODE_PATTERN: &str = r"^[A-Z0-9&-]{2,12}$";

/// 客户导入：按名称唯一，已存在时合并非空字段
pub fn accounts_schema() -> EngineResult<ImportSchema> {
    ImportSchema::builder(ACCOUNTS, EntityKind::Account)
        .key_field("name")
        .duplicate_strategy(DuplicateStrategy::Update)
        .batch_size(50)
        .rule(ValidationRule::required("name", "客户名称为必填项"))
        .rule(ValidationRule::length("name", 1, 200, "客户名称长度需在 1-200 个字符之间"))
        .rule(ValidationRule::email("email", "邮箱格式不正确"))
        .rule(ValidationRule::pattern("phone", PHONE_PATTERN, "电话号码格式不正确")?)
        .rule(ValidationRule::pattern("short_code", SHORT_CODE_PATTERN, "简码只能包含大写字母、数字、& 和 -，长度 2-12")?)
        .rule(ValidationRule::number("employee_count", "员工数必须为数字"))
        .rule(ValidationRule::number("annual_revenue", "年营收必须为数字"))
        .rule(ValidationRule::one_of(
            "status",
            &["active", "inactive", "prospect"],
            "状态必须为 active / inactive / prospect",
        ))
        .transform("name", Transform::Trim)
        .transform("email", Transform::Lowercase)
        .transform("short_code", Transform::Uppercase)
        .transform("employee_count", Transform::Number)
        .transform("annual_revenue", Transform::Number)
        .transform("status", Transform::Lowercase)
        .column(ColumnSpec::new("name", "Acme Corporation", "客户名称（必填，唯一）"))
        .column(ColumnSpec::new("legal_name", "Acme Corporation Pty Ltd", "法定名称，留空则使用客户名称"))
        .column(ColumnSpec::new("short_code", "ACME", "客户简码，用于推断行业分组"))
        .column(ColumnSpec::new("industry", "Technology", "行业，留空则按名称推断"))
        .column(ColumnSpec::new("industry_group", "Technology", "行业分组，留空则按简码推断"))
        .column(ColumnSpec::new("website", "https://acme.example", "官网"))
        .column(ColumnSpec::new("email", "hello@acme.example", "联系邮箱"))
        .column(ColumnSpec::new("phone", "+61 3 9000 0000", "联系电话"))
        .column(ColumnSpec::new("employee_count", "250", "员工数"))
        .column(ColumnSpec::new("annual_revenue", "12000000", "年营收"))
        .column(ColumnSpec::new("status", "active", "active / inactive / prospect"))
        .build()
}

/// 项目导入：按 (名称, 客户ID) 唯一，客户不存在时自动创建
pub fn jobs_schema() -> EngineResult<ImportSchema> {
    ImportSchema::builder(JOBS, EntityKind::Job)
        .key_field("name")
        .duplicate_strategy(DuplicateStrategy::Skip)
        .batch_size(25)
        .rule(ValidationRule::required("name", "项目名称为必填项"))
        .rule(ValidationRule::required("client_name", "客户名称为必填项"))
        .rule(ValidationRule::length("name", 1, 200, "项目名称长度需在 1-200 个字符之间"))
        .rule(ValidationRule::one_of(
            "status",
            &["active", "on_hold", "completed", "cancelled"],
            "状态必须为 active / on_hold / completed / cancelled",
        ))
        .rule(ValidationRule::one_of(
            "priority",
            &["low", "medium", "high", "urgent"],
            "优先级必须为 low / medium / high / urgent",
        ))
        .rule(ValidationRule::number("budget", "预算必须为数字"))
        .rule(ValidationRule::date("start_date", "开始日期格式不正确"))
        .transform("name", Transform::Trim)
        .transform("client_name", Transform::Trim)
        .transform("status", Transform::Lowercase)
        .transform("priority", Transform::Lowercase)
        .transform("new_business", Transform::Boolean)
        .transform("start_date", Transform::QuarterDate)
        .transform("budget", Transform::Number)
        .column(ColumnSpec::new("name", "Acme Website Redesign", "项目名称（必填）"))
        .column(ColumnSpec::new("client_name", "Acme Corporation", "客户名称（必填，不存在时自动创建）"))
        .column(ColumnSpec::new("new_business", "yes", "是否新业务，决定默认阶段"))
        .column(ColumnSpec::new("stage", "", "阶段，留空则按新业务标记设置"))
        .column(ColumnSpec::new("status", "active", "active / on_hold / completed / cancelled"))
        .column(ColumnSpec::new("priority", "medium", "low / medium / high / urgent"))
        .column(ColumnSpec::new("start_date", "Q125", "开始日期，支持季度写法 Q125 / Q1 25"))
        .column(ColumnSpec::new("budget", "45000", "预算"))
        .column(ColumnSpec::new("team", "", "负责团队，留空则按项目名称推断"))
        .build()
}

/// 用户导入：按邮箱唯一
pub fn users_schema() -> EngineResult<ImportSchema> {
    ImportSchema::builder(USERS, EntityKind::User)
        .key_field("email")
        .duplicate_strategy(DuplicateStrategy::Skip)
        .batch_size(50)
        .rule(ValidationRule::required("email", "邮箱为必填项"))
        .rule(ValidationRule::email("email", "邮箱格式不正确"))
        .rule(ValidationRule::length("name", 1, 120, "姓名长度需在 1-120 个字符之间"))
        .rule(ValidationRule::one_of(
            "role",
            &["admin", "manager", "member", "viewer"],
            "角色必须为 admin / manager / member / viewer",
        ))
        .rule(ValidationRule::pattern("phone", PHONE_PATTERN, "电话号码格式不正确")?)
        .transform("email", Transform::Lowercase)
        .transform("name", Transform::Trim)
        .transform("role", Transform::Lowercase)
        .column(ColumnSpec::new("email", "jane.doe@acme.example", "邮箱（必填，唯一）"))
        .column(ColumnSpec::new("name", "Jane Doe", "姓名"))
        .column(ColumnSpec::new("role", "member", "admin / manager / member / viewer"))
        .column(ColumnSpec::new("phone", "+61 400 000 000", "联系电话"))
        .column(ColumnSpec::new("team", "Digital", "所属团队"))
        .build()
}

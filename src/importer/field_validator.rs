// ==========================================
// CRM 批量导入引擎 - 字段校验器实现
// ==========================================
// 职责: 单值 × 单规则 校验（纯函数，无副作用）
// 红线: 除 required 外，空值一律视为通过（可选字段默认策略）
// ==========================================

use crate::domain::schema::{RuleKind, ValidationRule};
use crate::importer::import_trait::FieldValidator;
use crate::importer::transforms::parse_date;
use regex::Regex;
use std::sync::LazyLock;

/// 常规 local@domain.tld 邮箱格式
pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid email regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleValidator;

impl FieldValidator for RuleValidator {
    fn validate(&self, value: &str, rule: &ValidationRule) -> bool {
        if value.is_empty() {
            return !rule.is_required();
        }

        match &rule.kind {
            RuleKind::Required => !value.trim().is_empty(),
            RuleKind::Email => EMAIL_RE.is_match(value),
            RuleKind::Number => value
                .trim()
                .parse::<f64>()
                .map(f64::is_finite)
                .unwrap_or(false),
            RuleKind::Date => parse_date(value).is_some(),
            RuleKind::Enum(allowed) => allowed.iter().any(|a| a == value),
            RuleKind::Length { min, max } => {
                let len = value.chars().count();
                *min <= len && len <= *max
            }
            RuleKind::Pattern(regex) => regex.is_match(value),
        }
    }
}

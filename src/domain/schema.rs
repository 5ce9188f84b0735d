// ==========================================
// CRM 批量导入引擎 - 导入 Schema 模型
// ==========================================
// 职责: 描述一类实体的校验规则、字段转换、重复策略与批量大小
// 约束: Schema 在进程启动时构建并注册，注册后不可变
// ==========================================

use crate::domain::types::{DuplicateStrategy, EntityKind};
use crate::importer::error::{EngineResult, ImportError};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

// ==========================================
// RuleKind - 校验规则类别
// ==========================================
#[derive(Debug, Clone)]
pub enum RuleKind {
    Required,
    Email,
    Number,
    Date,
    Enum(Vec<String>),
    Length { min: usize, max: usize },
    Pattern(Regex),
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Email => "email",
            RuleKind::Number => "number",
            RuleKind::Date => "date",
            RuleKind::Enum(_) => "enum",
            RuleKind::Length { .. } => "length",
            RuleKind::Pattern(_) => "pattern",
        }
    }
}

// ==========================================
// ValidationRule - 单字段校验规则
// ==========================================
// 规则彼此独立，不存在跨字段规则
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub field: String,
    pub kind: RuleKind,
    pub message: String,
}

impl ValidationRule {
    pub fn new(field: impl Into<String>, kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Required, message)
    }

    pub fn email(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Email, message)
    }

    pub fn number(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Number, message)
    }

    pub fn date(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Date, message)
    }

    pub fn one_of(field: impl Into<String>, allowed: &[&str], message: impl Into<String>) -> Self {
        let allowed = allowed.iter().map(|v| v.to_string()).collect();
        Self::new(field, RuleKind::Enum(allowed), message)
    }

    pub fn length(
        field: impl Into<String>,
        min: usize,
        max: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::new(field, RuleKind::Length { min, max }, message)
    }

    /// 正则规则（表达式非法属于配置错误）
    pub fn pattern(
        field: impl Into<String>,
        pattern: &str,
        message: impl Into<String>,
    ) -> EngineResult<Self> {
        let field = field.into();
        let regex = Regex::new(pattern).map_err(|e| ImportError::InvalidPattern {
            field: field.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::new(field, RuleKind::Pattern(regex), message))
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, RuleKind::Required)
    }
}

// ==========================================
// Transform - 字段转换
// ==========================================
/// 自定义转换函数（失败返回错误描述）
pub type TransformFn = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

#[derive(Clone)]
pub enum Transform {
    Trim,
    Lowercase,
    Uppercase,
    Number,
    Date,
    QuarterDate,
    Boolean,
    Custom(TransformFn),
}

impl Transform {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        Transform::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Trim => write!(f, "Trim"),
            Transform::Lowercase => write!(f, "Lowercase"),
            Transform::Uppercase => write!(f, "Uppercase"),
            Transform::Number => write!(f, "Number"),
            Transform::Date => write!(f, "Date"),
            Transform::QuarterDate => write!(f, "QuarterDate"),
            Transform::Boolean => write!(f, "Boolean"),
            Transform::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

// ==========================================
// ColumnSpec - 模板列说明
// ==========================================
// 用途: 模板导出（表头 + 示例行 + 说明）与落库字段白名单
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub example: String,
    pub description: String,
}

impl ColumnSpec {
    pub fn new(
        name: impl Into<String>,
        example: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            example: example.into(),
            description: description.into(),
        }
    }
}

// ==========================================
// ImportSchema - 导入 Schema
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSchema {
    pub name: String,
    pub entity: EntityKind,
    pub table: String,
    pub key_field: String, // 重复判定主键字段
    pub rules: Vec<ValidationRule>,
    pub transforms: Vec<(String, Transform)>,
    pub duplicate_strategy: DuplicateStrategy,
    pub batch_size: usize,
    pub columns: Vec<ColumnSpec>,
}

impl ImportSchema {
    pub fn builder(name: impl Into<String>, entity: EntityKind) -> ImportSchemaBuilder {
        ImportSchemaBuilder::new(name.into(), entity)
    }

    /// 查找字段的转换函数
    pub fn transform_for(&self, field: &str) -> Option<&Transform> {
        self.transforms
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, transform)| transform)
    }

    /// 必填字段（按规则顺序，去重）
    pub fn required_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.is_required()) {
            if !fields.contains(&rule.field.as_str()) {
                fields.push(rule.field.as_str());
            }
        }
        fields
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.is_required() && rule.field == field)
    }

    /// 字段是否属于 schema 声明范围（列、规则或转换中出现）
    pub fn declares(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c.name == field)
            || self.rules.iter().any(|r| r.field == field)
            || self.transforms.iter().any(|(name, _)| name == field)
    }
}

// ==========================================
// ImportSchemaBuilder
// ==========================================
pub struct ImportSchemaBuilder {
    name: String,
    entity: EntityKind,
    table: Option<String>,
    key_field: Option<String>,
    rules: Vec<ValidationRule>,
    transforms: Vec<(String, Transform)>,
    duplicate_strategy: DuplicateStrategy,
    batch_size: usize,
    columns: Vec<ColumnSpec>,
}

impl ImportSchemaBuilder {
    fn new(name: String, entity: EntityKind) -> Self {
        Self {
            name,
            entity,
            table: None,
            key_field: None,
            rules: Vec::new(),
            transforms: Vec::new(),
            duplicate_strategy: DuplicateStrategy::Skip,
            batch_size: 100,
            columns: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn transform(mut self, field: impl Into<String>, transform: Transform) -> Self {
        let field = field.into();
        self.transforms.retain(|(name, _)| *name != field);
        self.transforms.push((field, transform));
        self
    }

    pub fn duplicate_strategy(mut self, strategy: DuplicateStrategy) -> Self {
        self.duplicate_strategy = strategy;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> EngineResult<ImportSchema> {
        let invalid = |message: &str| ImportError::InvalidSchema {
            schema: self.name.clone(),
            message: message.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("schema 名称不能为空"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size 必须为正整数"));
        }
        let table = match (&self.table, self.entity) {
            (Some(table), _) => table.clone(),
            (None, EntityKind::Generic) => self.name.clone(),
            (None, entity) => entity.as_str().to_string(),
        };
        let key_field = match (&self.key_field, self.entity) {
            (Some(field), _) => field.clone(),
            (None, EntityKind::User) => "email".to_string(),
            (None, EntityKind::Generic) => return Err(invalid("自定义实体必须声明 key_field")),
            (None, _) => "name".to_string(),
        };

        Ok(ImportSchema {
            name: self.name,
            entity: self.entity,
            table,
            key_field,
            rules: self.rules,
            transforms: self.transforms,
            duplicate_strategy: self.duplicate_strategy,
            batch_size: self.batch_size,
            columns: self.columns,
        })
    }
}

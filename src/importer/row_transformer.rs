// ==========================================
// CRM 批量导入引擎 - 行转换器实现
// ==========================================
// 职责: 字段转换 → 必填字段别名恢复 → 按实体自动填充
// 约束: 转换失败不抛错，置空并记警告；恢复与填充只产生警告
// ==========================================

use crate::config::HeuristicTables;
use crate::domain::report::RowIssue;
use crate::domain::row::Row;
use crate::domain::schema::ImportSchema;
use crate::domain::types::EntityKind;
use crate::importer::derivation::{
    derive_industry, derive_industry_group, derive_job_stage, derive_team,
};
use crate::importer::import_trait::{RowTransformer, TransformedRow};
use crate::importer::transforms::{self, parse_boolean};
use std::sync::Arc;
use tracing::debug;

pub struct SchemaRowTransformer {
    tables: Arc<HeuristicTables>,
}

impl SchemaRowTransformer {
    pub fn new(tables: Arc<HeuristicTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &HeuristicTables {
        &self.tables
    }

    /// 备选列名（自定义实体可按 schema 名称配置别名）
    fn aliases<'a>(&'a self, schema: &ImportSchema, field: &str) -> &'a [String] {
        let aliases = self.tables.aliases_for(schema.entity.as_str(), field);
        if aliases.is_empty() && schema.entity == EntityKind::Generic {
            return self.tables.aliases_for(&schema.name, field);
        }
        aliases
    }

    // ===== 客户: 法定名称 / 行业 / 行业分组 =====
    fn fill_account(&self, row: &mut Row, schema: &ImportSchema, row_number: usize) -> Vec<RowIssue> {
        let mut warnings = Vec::new();
        let Some(name) = row.non_empty("name").map(str::to_string) else {
            return warnings;
        };

        if fillable(schema, "legal_name") && row.non_empty("legal_name").is_none() {
            row.set("legal_name", name.as_str());
            warnings.push(RowIssue::for_field(
                row_number,
                "legal_name",
                "法定名称为空，已使用客户名称填充",
            ));
        }

        if fillable(schema, "industry") && row.non_empty("industry").is_none() {
            let industry = derive_industry(&self.tables, &name);
            warnings.push(RowIssue::for_field(
                row_number,
                "industry",
                format!("行业为空，已按名称关键字推断为 {}", industry),
            ));
            row.set("industry", industry);
        }

        if fillable(schema, "industry_group") && row.non_empty("industry_group").is_none() {
            let short_code = row.non_empty("short_code").unwrap_or("").to_string();
            let group = derive_industry_group(&self.tables, &short_code);
            let message = if short_code.is_empty() {
                format!("行业分组为空且无简码，已使用默认分组 {}", group)
            } else {
                format!("行业分组为空，已按简码 {} 推断为 {}", short_code, group)
            };
            warnings.push(RowIssue::for_field(row_number, "industry_group", message));
            row.set("industry_group", group);
        }

        warnings
    }

    // ===== 项目: 阶段 / 状态 / 优先级 / 团队 =====
    fn fill_job(&self, row: &mut Row, schema: &ImportSchema, row_number: usize) -> Vec<RowIssue> {
        let mut warnings = Vec::new();
        let defaults = &self.tables.job_defaults;

        if fillable(schema, "stage") && row.non_empty("stage").is_none() {
            let new_business = row
                .non_empty("new_business")
                .and_then(parse_boolean)
                .unwrap_or(false);
            let stage = derive_job_stage(&self.tables, new_business);
            warnings.push(RowIssue::for_field(
                row_number,
                "stage",
                format!(
                    "阶段为空，已按{}业务设置为 {}",
                    if new_business { "新" } else { "既有" },
                    stage
                ),
            ));
            row.set("stage", stage);
        }

        for (field, default) in [("status", &defaults.status), ("priority", &defaults.priority)] {
            if fillable(schema, field) && row.non_empty(field).is_none() {
                row.set(field, default.as_str());
                warnings.push(RowIssue::for_field(
                    row_number,
                    field,
                    format!("{} 为空，已使用默认值 {}", field, default),
                ));
            }
        }

        if fillable(schema, "team") && row.non_empty("team").is_none() {
            let team = row
                .non_empty("name")
                .and_then(|name| derive_team(&self.tables, name));
            if let Some(team) = team {
                warnings.push(RowIssue::for_field(
                    row_number,
                    "team",
                    format!("团队为空，已按项目名称推断为 {}", team),
                ));
                row.set("team", team);
            }
        }

        warnings
    }
}

// schema 未声明任何列时不限制字段
fn fillable(schema: &ImportSchema, field: &str) -> bool {
    schema.columns.is_empty() || schema.declares(field)
}

impl RowTransformer for SchemaRowTransformer {
    fn transform(&self, raw: &Row, schema: &ImportSchema, row_number: usize) -> TransformedRow {
        let mut row = raw.clone();
        let mut warnings = Vec::new();

        for (field, transform) in &schema.transforms {
            let Some(value) = raw.get(field) else {
                continue;
            };
            match transforms::apply(transform, value, &self.tables) {
                Ok(normalized) => row.set(field.as_str(), normalized),
                Err(reason) => {
                    debug!(row = row_number, field = %field, reason = %reason, "字段转换失败");
                    row.set(field.as_str(), "");
                    warnings.push(RowIssue::for_field(
                        row_number,
                        field,
                        format!("字段转换失败，已置空: {}", reason),
                    ));
                }
            }
        }

        TransformedRow { row, warnings }
    }

    fn recover_required(
        &self,
        raw: &Row,
        row: &mut Row,
        schema: &ImportSchema,
        field: &str,
        row_number: usize,
    ) -> Option<RowIssue> {
        for alias in self.aliases(schema, field) {
            let Some(candidate) = raw.non_empty(alias) else {
                continue;
            };

            let value = match schema.transform_for(field) {
                Some(transform) => match transforms::apply(transform, candidate, &self.tables) {
                    Ok(v) if !v.is_empty() => v,
                    _ => continue,
                },
                None => candidate.to_string(),
            };

            row.set(field, value);
            return Some(RowIssue::for_field(
                row_number,
                field,
                format!("必填字段 {} 为空，已从备选列 {} 恢复", field, alias),
            ));
        }
        None
    }

    fn auto_fill(&self, row: &mut Row, schema: &ImportSchema, row_number: usize) -> Vec<RowIssue> {
        match schema.entity {
            EntityKind::Account => self.fill_account(row, schema, row_number),
            EntityKind::Job => self.fill_job(row, schema, row_number),
            EntityKind::User | EntityKind::Generic => Vec::new(),
        }
    }
}

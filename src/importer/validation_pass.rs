// ==========================================
// CRM 批量导入引擎 - 预检（校验阶段）
// ==========================================
// 流程（逐行）: 转换 → 按 schema 顺序执行规则 → required 失败先尝试别名恢复
//              → 行有效时自动填充 → 文件内重复检测
// 红线: 不写入存储；单行失败不影响后续行
// ==========================================

use crate::domain::report::{
    display_row_number, BatchOutcome, ImportResult, RowDisposition, RowIssue,
};
use crate::domain::row::Row;
use crate::domain::schema::ImportSchema;
use crate::importer::conflict_handler::{natural_key, DuplicateTracker};
use crate::importer::import_trait::{FieldValidator, RowTransformer, TransformedRow};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// 单行预检结果
#[derive(Debug, Clone)]
pub struct CheckedRow {
    pub row_number: usize,
    pub row: Row, // 转换 + 恢复 + 填充后的行
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
}

impl CheckedRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct ValidationPass {
    transformer: Arc<dyn RowTransformer>,
    validator: Arc<dyn FieldValidator>,
}

impl ValidationPass {
    pub fn new(transformer: Arc<dyn RowTransformer>, validator: Arc<dyn FieldValidator>) -> Self {
        Self {
            transformer,
            validator,
        }
    }

    /// 预检单行（导入阶段复用）
    pub fn check_row(&self, raw: &Row, schema: &ImportSchema, data_row_index: usize) -> CheckedRow {
        let row_number = display_row_number(data_row_index);
        let TransformedRow {
            mut row,
            mut warnings,
        } = self.transformer.transform(raw, schema, row_number);
        let mut errors = Vec::new();

        for rule in &schema.rules {
            if self.validator.validate(row.value(&rule.field), rule) {
                continue;
            }

            if rule.is_required() {
                if let Some(warning) =
                    self.transformer
                        .recover_required(raw, &mut row, schema, &rule.field, row_number)
                {
                    warnings.push(warning);
                    continue;
                }
            }

            errors.push(RowIssue::for_field(row_number, &rule.field, rule.message.clone()));
        }

        if errors.is_empty() {
            warnings.extend(self.transformer.auto_fill(&mut row, schema, row_number));
        } else {
            debug!(row = row_number, errors = errors.len(), "行校验失败");
        }

        CheckedRow {
            row_number,
            row,
            errors,
            warnings,
        }
    }

    /// 预检全部行，生成就绪报告
    pub fn validate_rows(&self, rows: &[Row], schema: &ImportSchema) -> ImportResult {
        let start = Instant::now();
        let mut outcome = BatchOutcome::new();
        let mut tracker = DuplicateTracker::new();

        for (idx, raw) in rows.iter().enumerate() {
            let CheckedRow {
                row_number,
                row,
                errors,
                mut warnings,
            } = self.check_row(raw, schema, idx);

            if !errors.is_empty() {
                outcome.record(RowDisposition::Failed, errors, warnings);
                continue;
            }

            if let Some(key) = natural_key(schema, &row) {
                if let Some(first_row) = tracker.observe(key, row_number) {
                    outcome.mark_duplicate();
                    warnings.push(RowIssue::for_field(
                        row_number,
                        &schema.key_field,
                        format!("与第 {} 行重复，导入时将按 {} 策略处理", first_row, schema.duplicate_strategy),
                    ));
                }
            }
            outcome.record(RowDisposition::Valid, Vec::new(), warnings);
        }

        let result = ImportResult::from_validation(outcome, rows.len(), start.elapsed());
        info!(
            schema = %schema.name,
            total_rows = result.summary.total_rows,
            valid_rows = result.summary.valid_rows,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            duplicates = result.summary.duplicates,
            "预检完成"
        );
        result
    }
}

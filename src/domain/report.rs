// ==========================================
// CRM 批量导入引擎 - 导入报告模型
// ==========================================
// 职责: 校验/导入两个阶段共用的结果、错误、警告、汇总类型
// 约束: 行号 = 数据行下标 + 2（含表头，与电子表格中看到的行号一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// 数据行下标 → 用户可见行号
pub fn display_row_number(data_row_index: usize) -> usize {
    data_row_index + 2
}

// ==========================================
// RowIssue - 行级错误/警告
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl RowIssue {
    pub fn new(row: usize, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn for_field(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self::new(row, Some(field), message)
    }

    pub fn for_row(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, None, message)
    }
}

// ==========================================
// ImportSummary - 汇总统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub duplicates: usize,
    pub failed_rows: usize, // 至少有一条行级错误的行数
    pub processing_time_ms: u64,
}

// ==========================================
// RowDisposition - 单行最终去向
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDisposition {
    Valid, // 仅校验阶段使用
    Imported,
    Updated,
    Skipped,
    Failed,
}

// ==========================================
// BatchOutcome - 批次部分结果
// ==========================================
// 每个批次独立累计，最后按输入顺序合并
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub valid_rows: usize,
    pub duplicates: usize,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    failed: BTreeSet<usize>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一行的处理结果
    pub fn record(
        &mut self,
        disposition: RowDisposition,
        errors: Vec<RowIssue>,
        warnings: Vec<RowIssue>,
    ) {
        match disposition {
            RowDisposition::Valid => self.valid_rows += 1,
            RowDisposition::Imported => {
                self.imported += 1;
                self.valid_rows += 1;
            }
            RowDisposition::Updated => {
                self.updated += 1;
                self.valid_rows += 1;
            }
            RowDisposition::Skipped => {
                self.skipped += 1;
                self.valid_rows += 1;
            }
            RowDisposition::Failed => {}
        }

        if disposition == RowDisposition::Failed || !errors.is_empty() {
            // 失败行必须留下至少一条错误，保证错误列表与失败行数一致
            if let Some(row) = errors.first().map(|e| e.row) {
                self.failed.insert(row);
            }
        }
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }

    pub fn mark_duplicate(&mut self) {
        self.duplicates += 1;
    }

    pub fn failed_rows(&self) -> usize {
        self.failed.len()
    }

    /// 合并另一个批次的部分结果
    pub fn merge(&mut self, other: BatchOutcome) {
        self.imported += other.imported;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.valid_rows += other.valid_rows;
        self.duplicates += other.duplicates;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.failed.extend(other.failed);
    }
}

// ==========================================
// ImportResult - 最终结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub summary: ImportSummary,
}

impl ImportResult {
    /// 校验阶段结果：无任何硬错误才算成功
    pub fn from_validation(outcome: BatchOutcome, total_rows: usize, elapsed: Duration) -> Self {
        let success = outcome.errors.is_empty();
        let message = if success {
            format!("校验通过：共 {} 行，全部可导入", total_rows)
        } else {
            format!(
                "校验发现 {} 个错误（涉及 {} 行），请修正后重试",
                outcome.errors.len(),
                outcome.failed_rows()
            )
        };
        Self::assemble(outcome, success, message, total_rows, elapsed)
    }

    /// 导入阶段结果：失败行占比低于阈值即视为成功
    pub fn from_execution(
        outcome: BatchOutcome,
        total_rows: usize,
        error_rate_threshold: f64,
        elapsed: Duration,
    ) -> Self {
        let failed_rows = outcome.failed_rows();
        let success = (failed_rows as f64) < (total_rows as f64) * error_rate_threshold;
        let message = if total_rows == 0 {
            "文件中没有可导入的数据行".to_string()
        } else if success {
            format!(
                "导入完成：新增 {}，更新 {}，跳过 {}，失败 {}",
                outcome.imported, outcome.updated, outcome.skipped, failed_rows
            )
        } else {
            format!(
                "导入失败：{}/{} 行出错，超过容错阈值",
                failed_rows, total_rows
            )
        };
        Self::assemble(outcome, success, message, total_rows, elapsed)
    }

    fn assemble(
        mut outcome: BatchOutcome,
        success: bool,
        message: String,
        total_rows: usize,
        elapsed: Duration,
    ) -> Self {
        outcome.errors.sort_by_key(|issue| issue.row);
        outcome.warnings.sort_by_key(|issue| issue.row);
        let failed_rows = outcome.failed_rows();

        Self {
            success,
            message,
            imported: outcome.imported,
            updated: outcome.updated,
            skipped: outcome.skipped,
            errors: outcome.errors,
            warnings: outcome.warnings,
            summary: ImportSummary {
                total_rows,
                valid_rows: outcome.valid_rows,
                duplicates: outcome.duplicates,
                failed_rows,
                processing_time_ms: elapsed.as_millis() as u64,
            },
        }
    }

    /// 行计数守恒：新增 + 更新 + 跳过 + 失败行 == 总行数
    pub fn rows_accounted(&self) -> bool {
        self.imported + self.updated + self.skipped + self.summary.failed_rows
            == self.summary.total_rows
    }
}

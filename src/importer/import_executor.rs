// ==========================================
// CRM 批量导入引擎 - 导入执行器
// ==========================================
// 流程: 分批 → 逐行预检 → 依赖解析（项目 → 客户）→ 重复策略 → 落库 → 汇总 → 审计
// 红线: 单行异常转为行级错误，不得中止批次；批次失败不阻塞后续批次
// 红线: 同一 (表, 主键) 的查找与插入在 KeyLocks 下串行
// ==========================================

use crate::config::{HeuristicTables, ImportSettings};
use crate::domain::record::{Record, RecordFields};
use crate::domain::report::{BatchOutcome, ImportResult, RowDisposition, RowIssue};
use crate::domain::row::Row;
use crate::domain::schema::{ImportSchema, Transform};
use crate::domain::types::EntityKind;
use crate::importer::conflict_handler::{decide, DuplicateAction, KeyLocks};
use crate::importer::derivation::{derive_industry, derive_industry_group};
use crate::importer::error::EngineResult;
use crate::importer::validation_pass::ValidationPass;
use crate::repository::{ActivityLogger, RecordStore};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 项目依赖的客户表
pub const ACCOUNT_TABLE: &str = "accounts";

// ==========================================
// RowCommit - 单行落库结果
// ==========================================
#[derive(Debug)]
struct RowCommit {
    disposition: RowDisposition,
    duplicate: bool, // 主键已存在于存储中
    errors: Vec<RowIssue>,
    warnings: Vec<RowIssue>,
}

impl RowCommit {
    fn new(disposition: RowDisposition, duplicate: bool) -> Self {
        Self {
            disposition,
            duplicate,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn failed(row_number: usize, field: &str, message: String, duplicate: bool) -> Self {
        Self {
            disposition: RowDisposition::Failed,
            duplicate,
            errors: vec![RowIssue::for_field(row_number, field, message)],
            warnings: Vec::new(),
        }
    }
}

// ==========================================
// ImportExecutor
// ==========================================
pub struct ImportExecutor {
    store: Arc<dyn RecordStore>,
    activity_logger: Arc<dyn ActivityLogger>,
    pass: Arc<ValidationPass>,
    tables: Arc<HeuristicTables>,
    locks: Arc<KeyLocks>,
    error_rate_threshold: f64,
    max_concurrent_batches: usize,
}

impl ImportExecutor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        activity_logger: Arc<dyn ActivityLogger>,
        pass: Arc<ValidationPass>,
        tables: Arc<HeuristicTables>,
        settings: &ImportSettings,
    ) -> Self {
        Self {
            store,
            activity_logger,
            pass,
            tables,
            locks: Arc::new(KeyLocks::new()),
            error_rate_threshold: settings.error_rate_threshold,
            max_concurrent_batches: settings.max_concurrent_batches.max(1),
        }
    }

    /// 与其他执行器共享主键锁
    pub fn with_locks(mut self, locks: Arc<KeyLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// 执行导入
    ///
    /// # 返回
    /// - 总是返回结构化结果；行级问题进入 errors / warnings
    #[instrument(skip(self, rows, schema), fields(schema = %schema.name, total_rows = rows.len()))]
    pub async fn execute(&self, rows: &[Row], schema: &ImportSchema) -> ImportResult {
        let start = Instant::now();
        let batch_size = schema.batch_size.max(1);

        info!(
            batch_size = batch_size,
            max_concurrent_batches = self.max_concurrent_batches,
            "开始导入"
        );

        // 有序缓冲：最多 N 个批次同时执行，结果按输入顺序产出
        let batches: Vec<_> = rows
            .chunks(batch_size)
            .enumerate()
            .map(|(batch_idx, chunk)| {
                self.process_batch(schema, batch_idx, batch_idx * batch_size, chunk)
            })
            .collect();
        let partials: Vec<BatchOutcome> = stream::iter(batches)
            .buffered(self.max_concurrent_batches)
            .collect()
            .await;

        let mut outcome = BatchOutcome::new();
        for partial in partials {
            outcome.merge(partial);
        }

        let result = ImportResult::from_execution(
            outcome,
            rows.len(),
            self.error_rate_threshold,
            start.elapsed(),
        );

        self.emit_audit_event(schema, &result).await;

        info!(
            success = result.success,
            imported = result.imported,
            updated = result.updated,
            skipped = result.skipped,
            failed_rows = result.summary.failed_rows,
            duplicates = result.summary.duplicates,
            elapsed_ms = result.summary.processing_time_ms,
            "导入完成"
        );
        result
    }

    async fn process_batch(
        &self,
        schema: &ImportSchema,
        batch_idx: usize,
        first_index: usize,
        chunk: &[Row],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::new();

        for (offset, raw) in chunk.iter().enumerate() {
            let checked = self.pass.check_row(raw, schema, first_index + offset);
            let row_number = checked.row_number;
            if !checked.is_valid() {
                outcome.record(RowDisposition::Failed, checked.errors, checked.warnings);
                continue;
            }

            let mut warnings = checked.warnings;
            match self.commit_row(schema, &checked.row, row_number).await {
                Ok(commit) => {
                    if commit.duplicate {
                        outcome.mark_duplicate();
                    }
                    warnings.extend(commit.warnings);
                    outcome.record(commit.disposition, commit.errors, warnings);
                }
                Err(e) => {
                    warn!(row = row_number, error = %e, "行写入失败");
                    outcome.record(
                        RowDisposition::Failed,
                        vec![RowIssue::for_row(row_number, format!("写入失败: {}", e))],
                        warnings,
                    );
                }
            }
        }

        debug!(
            batch = batch_idx,
            rows = chunk.len(),
            imported = outcome.imported,
            updated = outcome.updated,
            skipped = outcome.skipped,
            failed_rows = outcome.failed_rows(),
            "批次处理完成"
        );
        outcome
    }

    async fn commit_row(
        &self,
        schema: &ImportSchema,
        row: &Row,
        row_number: usize,
    ) -> EngineResult<RowCommit> {
        match schema.entity {
            EntityKind::Job => self.commit_job(schema, row, row_number).await,
            EntityKind::Account | EntityKind::User | EntityKind::Generic => {
                self.commit_keyed(schema, row, row_number).await
            }
        }
    }

    // ===== 客户 / 用户 / 自定义实体: 按主键字段判重 =====
    async fn commit_keyed(
        &self,
        schema: &ImportSchema,
        row: &Row,
        row_number: usize,
    ) -> EngineResult<RowCommit> {
        let key_field = schema.key_field.as_str();
        let Some(key) = row.non_empty(key_field) else {
            return Ok(RowCommit::failed(
                row_number,
                key_field,
                format!("主键字段 {} 为空，无法判重", key_field),
                false,
            ));
        };

        let _guard = self.locks.acquire(&schema.table, key).await?;
        let existing = self.store.find_one(&schema.table, key_field, key).await?;

        self.apply_strategy(
            schema,
            existing.as_ref(),
            record_fields(schema, row),
            row_number,
            &format!("{} = {}", key_field, key),
        )
        .await
    }

    // ===== 项目: 先解析客户，再按 (名称, 客户ID) 判重 =====
    async fn commit_job(
        &self,
        schema: &ImportSchema,
        row: &Row,
        row_number: usize,
    ) -> EngineResult<RowCommit> {
        let key_field = schema.key_field.as_str();
        let (Some(name), Some(client_name)) = (row.non_empty(key_field), row.non_empty("client_name"))
        else {
            return Ok(RowCommit::failed(
                row_number,
                key_field,
                "项目名称或客户名称为空，无法关联客户".to_string(),
                false,
            ));
        };

        let (account_id, mut warnings) = self.resolve_account(client_name, row_number).await?;

        let mut fields = record_fields(schema, row);
        fields.insert("account_id".to_string(), JsonValue::String(account_id.clone()));

        let lock_key = format!("{}\u{1f}{}", name, account_id);
        let _guard = self.locks.acquire(&schema.table, &lock_key).await?;
        let existing = self
            .store
            .find_matching(
                &schema.table,
                &[(key_field, name), ("account_id", account_id.as_str())],
            )
            .await?;

        let mut commit = self
            .apply_strategy(
                schema,
                existing.as_ref(),
                fields,
                row_number,
                &format!("{} = {}, 客户 = {}", key_field, name, client_name),
            )
            .await?;
        warnings.append(&mut commit.warnings);
        commit.warnings = warnings;
        Ok(commit)
    }

    /// 按名称解析客户；不存在时自动创建
    ///
    /// # 返回
    /// - (客户ID, 警告)：自动创建时附带一条警告
    async fn resolve_account(
        &self,
        client_name: &str,
        row_number: usize,
    ) -> EngineResult<(String, Vec<RowIssue>)> {
        let _guard = self.locks.acquire(ACCOUNT_TABLE, client_name).await?;

        if let Some(account) = self.store.find_one(ACCOUNT_TABLE, "name", client_name).await? {
            return Ok((account.id, Vec::new()));
        }

        let mut fields = RecordFields::new();
        fields.insert("name".to_string(), json!(client_name));
        fields.insert("legal_name".to_string(), json!(client_name));
        fields.insert(
            "industry".to_string(),
            json!(derive_industry(&self.tables, client_name)),
        );
        fields.insert(
            "industry_group".to_string(),
            json!(derive_industry_group(&self.tables, "")),
        );

        let account_id = self.store.insert(ACCOUNT_TABLE, fields).await?;
        info!(row = row_number, client_name = %client_name, account_id = %account_id, "自动创建客户");

        Ok((
            account_id,
            vec![RowIssue::for_field(
                row_number,
                "client_name",
                format!("客户 {} 不存在，已自动创建", client_name),
            )],
        ))
    }

    async fn apply_strategy(
        &self,
        schema: &ImportSchema,
        existing: Option<&Record>,
        fields: RecordFields,
        row_number: usize,
        key_desc: &str,
    ) -> EngineResult<RowCommit> {
        let duplicate = existing.is_some();

        match decide(schema.duplicate_strategy, existing) {
            DuplicateAction::Insert => {
                self.store.insert(&schema.table, fields).await?;
                Ok(RowCommit::new(RowDisposition::Imported, duplicate))
            }
            DuplicateAction::Skip => Ok(RowCommit::new(RowDisposition::Skipped, duplicate)),
            DuplicateAction::Update(id) => {
                self.store.update(&schema.table, &id, fields).await?;
                Ok(RowCommit::new(RowDisposition::Updated, duplicate))
            }
            DuplicateAction::Reject => Ok(RowCommit::failed(
                row_number,
                &schema.key_field,
                format!("记录已存在（{}），重复策略为 error", key_desc),
                duplicate,
            )),
        }
    }

    // 审计失败只记日志，不影响导入结果
    async fn emit_audit_event(&self, schema: &ImportSchema, result: &ImportResult) {
        let details = json!({
            "schema": schema.name,
            "imported": result.imported,
            "updated": result.updated,
            "skipped": result.skipped,
            "errors": result.errors.len(),
            "failedRows": result.summary.failed_rows,
            "totalRows": result.summary.total_rows,
            "success": result.success,
        });

        if let Err(e) = self
            .activity_logger
            .log("import", &schema.name, "bulk_import", details)
            .await
        {
            warn!(schema = %schema.name, error = %e, "审计事件写入失败，已忽略");
        }
    }
}

/// 行 → 落库字段（仅非空值；schema 声明列时只保留声明字段）
pub fn record_fields(schema: &ImportSchema, row: &Row) -> RecordFields {
    let mut fields = RecordFields::new();
    for (column, value) in row.iter() {
        if value.trim().is_empty() {
            continue;
        }
        if !schema.columns.is_empty() && !schema.declares(column) {
            continue;
        }
        fields.insert(
            column.to_string(),
            typed_value(schema.transform_for(column), value),
        );
    }
    fields
}

// 数字 / 布尔转换后的字段以 JSON 原生类型存储
fn typed_value(transform: Option<&Transform>, value: &str) -> JsonValue {
    match transform {
        Some(Transform::Number) => {
            if let Ok(n) = value.parse::<i64>() {
                return json!(n);
            }
            value
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(value.to_string()))
        }
        Some(Transform::Boolean) => match value {
            "true" => JsonValue::Bool(true),
            "false" => JsonValue::Bool(false),
            other => JsonValue::String(other.to_string()),
        },
        _ => JsonValue::String(value.to_string()),
    }
}

// ==========================================
// CRM 批量导入引擎 - 批量导入器实现
// ==========================================
// 职责: 整合导入流程（schema 查找 → 文件解析 → 预检 / 导入 → 报告）
// 约束: 配置在构建时一次性读取；schema 注册表构建后只读
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::report::ImportResult;
use crate::domain::row::Row;
use crate::importer::conflict_handler::KeyLocks;
use crate::importer::error::EngineResult;
use crate::importer::field_validator::RuleValidator;
use crate::importer::file_parser::CsvParser;
use crate::importer::import_executor::ImportExecutor;
use crate::importer::import_trait::{BulkImporter, FileParser};
use crate::importer::row_transformer::SchemaRowTransformer;
use crate::importer::schema_registry::SchemaRegistry;
use crate::importer::template;
use crate::importer::validation_pass::ValidationPass;
use crate::repository::{ActivityLogger, RecordStore};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument};

// ==========================================
// BulkImporterImpl - 批量导入器实现
// ==========================================
pub struct BulkImporterImpl {
    // schema 注册表
    registry: Arc<SchemaRegistry>,

    // 导入组件
    parser: Box<dyn FileParser>,
    pass: Arc<ValidationPass>,
    executor: ImportExecutor,
}

impl BulkImporterImpl {
    /// 创建新的 BulkImporter 实例
    ///
    /// # 参数
    /// - registry: schema 注册表
    /// - store: 记录存储
    /// - activity_logger: 审计日志
    /// - settings: 配置快照
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn RecordStore>,
        activity_logger: Arc<dyn ActivityLogger>,
        settings: &ImportSettings,
    ) -> Self {
        let tables = Arc::new(settings.heuristics.clone());
        let pass = Arc::new(ValidationPass::new(
            Arc::new(SchemaRowTransformer::new(Arc::clone(&tables))),
            Arc::new(RuleValidator),
        ));
        let executor =
            ImportExecutor::new(store, activity_logger, Arc::clone(&pass), tables, settings);

        Self {
            registry,
            parser: Box::new(CsvParser::from_settings(settings)),
            pass,
            executor,
        }
    }

    /// 从配置读取器加载配置后创建
    pub async fn from_config(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn RecordStore>,
        activity_logger: Arc<dyn ActivityLogger>,
        config: &dyn ImportConfigReader,
    ) -> EngineResult<Self> {
        let settings = ImportSettings::load(config).await?;
        Ok(Self::new(registry, store, activity_logger, &settings))
    }

    /// 与其他导入器共享主键锁（同一存储上的多个导入器）
    pub fn with_key_locks(mut self, locks: Arc<KeyLocks>) -> Self {
        self.executor = self.executor.with_locks(locks);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

#[async_trait]
impl BulkImporter for BulkImporterImpl {
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn validate_data(&self, rows: &[Row], schema_name: &str) -> EngineResult<ImportResult> {
        let schema = self.registry.get(schema_name)?;
        Ok(self.pass.validate_rows(rows, &schema))
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn execute_import(
        &self,
        rows: &[Row],
        schema_name: &str,
    ) -> EngineResult<ImportResult> {
        let schema = self.registry.get(schema_name)?;
        Ok(self.executor.execute(rows, &schema).await)
    }

    async fn validate_file(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        schema_name: &str,
    ) -> EngineResult<ImportResult> {
        let schema = self.registry.get(schema_name)?;
        let rows = self.parse_logged(|| self.parser.parse_bytes(bytes, content_type))?;
        Ok(self.pass.validate_rows(&rows, &schema))
    }

    async fn import_file(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        schema_name: &str,
    ) -> EngineResult<ImportResult> {
        let schema = self.registry.get(schema_name)?;
        let rows = self.parse_logged(|| self.parser.parse_bytes(bytes, content_type))?;
        Ok(self.executor.execute(&rows, &schema).await)
    }

    async fn validate_path(&self, path: &Path, schema_name: &str) -> EngineResult<ImportResult> {
        let schema = self.registry.get(schema_name)?;
        info!(file = %path.display(), schema = %schema_name, "开始预检文件");
        let rows = self.parse_logged(|| self.parser.parse_path(path))?;
        Ok(self.pass.validate_rows(&rows, &schema))
    }

    async fn import_path(&self, path: &Path, schema_name: &str) -> EngineResult<ImportResult> {
        let schema = self.registry.get(schema_name)?;
        info!(file = %path.display(), schema = %schema_name, "开始导入文件");
        let rows = self.parse_logged(|| self.parser.parse_path(path))?;
        Ok(self.executor.execute(&rows, &schema).await)
    }

    fn generate_template(&self, schema_name: &str) -> EngineResult<String> {
        let schema = self.registry.get(schema_name)?;
        template::generate_template(&schema)
    }
}

impl BulkImporterImpl {
    fn parse_logged<F>(&self, parse: F) -> EngineResult<Vec<Row>>
    where
        F: FnOnce() -> EngineResult<Vec<Row>>,
    {
        match parse() {
            Ok(rows) => {
                info!(total_rows = rows.len(), "文件解析完成");
                Ok(rows)
            }
            Err(e) => {
                error!(error = %e, "文件解析失败");
                Err(e)
            }
        }
    }
}

// ==========================================
// CRM 批量导入引擎 - 导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 解析 → 转换 → 校验（别名恢复 / 自动填充）→ 冲突处理 → 落库 → 报告
// ==========================================

use crate::domain::report::{ImportResult, RowIssue};
use crate::domain::row::Row;
use crate::domain::schema::{ImportSchema, ValidationRule};
use crate::importer::error::EngineResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// BulkImporter Trait
// ==========================================
// 用途: 批量导入主接口
// 实现者: BulkImporterImpl
#[async_trait]
pub trait BulkImporter: Send + Sync {
    /// 预检：对全部行执行转换与校验，不写入存储
    ///
    /// # 错误
    /// - ImportError::UnknownSchema: schema 未注册
    async fn validate_data(&self, rows: &[Row], schema_name: &str) -> EngineResult<ImportResult>;

    /// 导入：分批提交到 Record Store，逐行汇总结果
    ///
    /// # 说明
    /// - 单行失败不会中止批次，单批次失败不会阻塞后续批次
    /// - 仅 schema 查找失败返回 Err
    async fn execute_import(&self, rows: &[Row], schema_name: &str)
        -> EngineResult<ImportResult>;

    /// 解析字节流后预检
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - content_type: 调用方声明的 MIME 类型（可选）
    async fn validate_file(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        schema_name: &str,
    ) -> EngineResult<ImportResult>;

    /// 解析字节流后导入
    async fn import_file(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        schema_name: &str,
    ) -> EngineResult<ImportResult>;

    /// 读取文件后预检（内容类型按扩展名推断）
    async fn validate_path(&self, path: &Path, schema_name: &str) -> EngineResult<ImportResult>;

    /// 读取文件后导入（内容类型按扩展名推断）
    async fn import_path(&self, path: &Path, schema_name: &str) -> EngineResult<ImportResult>;

    /// 导出模板（注释行 + 表头 + 示例行）
    fn generate_template(&self, schema_name: &str) -> EngineResult<String>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析字节流为行序列
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - content_type: 声明的 MIME 类型（None 表示未声明）
    ///
    /// # 返回
    /// - Ok(Vec<Row>): 非空白数据行（不含表头）
    /// - Err: 文件级错误（过大 / 格式不支持 / 编码异常 / 空文件）
    fn parse_bytes(&self, bytes: &[u8], content_type: Option<&str>) -> EngineResult<Vec<Row>>;

    /// 读取并解析文件（内容类型按扩展名推断）
    fn parse_path(&self, path: &Path) -> EngineResult<Vec<Row>>;
}

// ==========================================
// FieldValidator Trait
// ==========================================
// 用途: 单规则校验接口（纯函数）
// 实现者: RuleValidator
pub trait FieldValidator: Send + Sync {
    /// 校验单个值
    ///
    /// # 规则
    /// - 除 required 外，空值对所有规则均视为通过
    fn validate(&self, value: &str, rule: &ValidationRule) -> bool;
}

// ==========================================
// RowTransformer Trait
// ==========================================
// 用途: 行转换接口（字段转换 / 别名恢复 / 自动填充）
// 实现者: SchemaRowTransformer
pub trait RowTransformer: Send + Sync {
    /// 应用 schema 声明的字段转换
    ///
    /// # 返回
    /// - 规范化后的行；转换失败的字段置空并附带警告
    fn transform(&self, raw: &Row, schema: &ImportSchema, row_number: usize) -> TransformedRow;

    /// 必填字段为空时，从别名列恢复
    ///
    /// # 返回
    /// - Some(warning): 已恢复，值写入 row
    /// - None: 所有别名列均为空
    fn recover_required(
        &self,
        raw: &Row,
        row: &mut Row,
        schema: &ImportSchema,
        field: &str,
        row_number: usize,
    ) -> Option<RowIssue>;

    /// 按实体类别自动填充可推断的空字段
    ///
    /// # 返回
    /// - 每个被填充字段对应一条警告
    fn auto_fill(&self, row: &mut Row, schema: &ImportSchema, row_number: usize) -> Vec<RowIssue>;
}

/// 转换后的行及转换阶段产生的警告
#[derive(Debug, Clone)]
pub struct TransformedRow {
    pub row: Row,
    pub warnings: Vec<RowIssue>,
}

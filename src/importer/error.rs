// ==========================================
// CRM 批量导入引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 仅配置错误与文件级错误会中止整次调用；行级问题进入报告
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误 =====
    #[error("未注册的导入 schema: {0}")]
    UnknownSchema(String),

    #[error("schema 已注册，不允许覆盖: {0}")]
    SchemaAlreadyRegistered(String),

    #[error("schema 定义无效 ({schema}): {message}")]
    InvalidSchema { schema: String, message: String },

    #[error("正则表达式无效 (字段 {field}): {message}")]
    InvalidPattern { field: String, message: String },

    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件过大: {size} 字节，上限 {limit} 字节")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("文件格式不支持: {0}（仅支持逗号分隔的文本文件 .csv/.txt）")]
    UnsupportedFormat(String),

    #[error("文件编码异常: 前 {sample} 个字符中出现无法解码的字符，请另存为 UTF-8 后重试")]
    EncodingError { sample: usize },

    #[error("文件为空或缺少表头")]
    EmptyFile,

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 存储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ImportError {
    /// 是否为文件级错误（在解析任何行之前报告）
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::FileReadError(_)
                | ImportError::FileTooLarge { .. }
                | ImportError::UnsupportedFormat(_)
                | ImportError::EncodingError { .. }
                | ImportError::EmptyFile
                | ImportError::CsvParseError(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, ImportError>;

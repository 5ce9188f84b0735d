// ==========================================
// CRM 批量导入引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入引擎所需的配置读取接口，以及引擎构建时使用的配置快照
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::heuristics::HeuristicTables;
use crate::importer::error::{EngineResult, ImportError};
use async_trait::async_trait;

/// 默认文件大小上限: 50 MiB
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// 默认编码检查采样长度（字符）
pub const DEFAULT_ENCODING_SAMPLE_CHARS: usize = 1024;

/// 默认容错阈值: 失败行少于一半即视为成功
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 0.5;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）, StaticConfig（内存）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取文件大小上限（字节）
    ///
    /// # 默认值
    /// - 52428800 (50 MiB)
    async fn get_max_file_bytes(&self) -> EngineResult<u64>;

    /// 获取编码检查采样长度（字符）
    ///
    /// # 默认值
    /// - 1024
    async fn get_encoding_sample_chars(&self) -> EngineResult<usize>;

    /// 获取容错阈值（失败行占比低于该值视为成功）
    ///
    /// # 默认值
    /// - 0.5
    async fn get_error_rate_threshold(&self) -> EngineResult<f64>;

    /// 获取批次并发上限
    ///
    /// # 默认值
    /// - 1（严格顺序处理）
    async fn get_max_concurrent_batches(&self) -> EngineResult<usize>;

    /// 获取启发式映射表
    ///
    /// # 默认值
    /// - HeuristicTables::default()
    async fn get_heuristic_tables(&self) -> EngineResult<HeuristicTables>;
}

// ==========================================
// ImportSettings - 配置快照
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub max_file_bytes: u64,
    pub encoding_sample_chars: usize,
    pub error_rate_threshold: f64,
    pub max_concurrent_batches: usize,
    pub heuristics: HeuristicTables,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            encoding_sample_chars: DEFAULT_ENCODING_SAMPLE_CHARS,
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
            max_concurrent_batches: 1,
            heuristics: HeuristicTables::default(),
        }
    }
}

impl ImportSettings {
    /// 从配置读取器加载并校验配置快照
    pub async fn load(reader: &dyn ImportConfigReader) -> EngineResult<Self> {
        let settings = Self {
            max_file_bytes: reader.get_max_file_bytes().await?,
            encoding_sample_chars: reader.get_encoding_sample_chars().await?,
            error_rate_threshold: reader.get_error_rate_threshold().await?,
            max_concurrent_batches: reader.get_max_concurrent_batches().await?,
            heuristics: reader.get_heuristic_tables().await?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |key: &str, value: String, message: &str| ImportError::ConfigValueError {
            key: key.to_string(),
            value,
            message: message.to_string(),
        };

        if self.max_file_bytes == 0 {
            return Err(invalid("max_file_bytes", "0".to_string(), "必须大于 0"));
        }
        if !(self.error_rate_threshold > 0.0 && self.error_rate_threshold <= 1.0) {
            return Err(invalid(
                "error_rate_threshold",
                self.error_rate_threshold.to_string(),
                "必须位于 (0, 1] 区间",
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(invalid("max_concurrent_batches", "0".to_string(), "必须大于 0"));
        }
        Ok(())
    }
}

// ==========================================
// StaticConfig - 内存配置（测试/嵌入场景）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    settings: ImportSettings,
}

impl StaticConfig {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ImportConfigReader for StaticConfig {
    async fn get_max_file_bytes(&self) -> EngineResult<u64> {
        Ok(self.settings.max_file_bytes)
    }

    async fn get_encoding_sample_chars(&self) -> EngineResult<usize> {
        Ok(self.settings.encoding_sample_chars)
    }

    async fn get_error_rate_threshold(&self) -> EngineResult<f64> {
        Ok(self.settings.error_rate_threshold)
    }

    async fn get_max_concurrent_batches(&self) -> EngineResult<usize> {
        Ok(self.settings.max_concurrent_batches)
    }

    async fn get_heuristic_tables(&self) -> EngineResult<HeuristicTables> {
        Ok(self.settings.heuristics.clone())
    }
}

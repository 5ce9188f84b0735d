// ==========================================
// CRM 批量导入引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::heuristics::HeuristicTables;
use crate::config::import_config_trait::{
    ImportConfigReader, DEFAULT_ENCODING_SAMPLE_CHARS, DEFAULT_ERROR_RATE_THRESHOLD,
    DEFAULT_MAX_FILE_BYTES,
};
use crate::importer::error::{EngineResult, ImportError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> EngineResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> EngineResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: format!("锁获取失败: {}", e),
        })?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入 global scope 配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> EngineResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值，缺失时返回默认值，格式错误返回配置错误
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> EngineResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_file_bytes(&self) -> EngineResult<u64> {
        self.get_parsed_or_default(config_keys::MAX_FILE_BYTES, DEFAULT_MAX_FILE_BYTES)
    }

    async fn get_encoding_sample_chars(&self) -> EngineResult<usize> {
        self.get_parsed_or_default(
            config_keys::ENCODING_SAMPLE_CHARS,
            DEFAULT_ENCODING_SAMPLE_CHARS,
        )
    }

    async fn get_error_rate_threshold(&self) -> EngineResult<f64> {
        self.get_parsed_or_default(
            config_keys::ERROR_RATE_THRESHOLD,
            DEFAULT_ERROR_RATE_THRESHOLD,
        )
    }

    async fn get_max_concurrent_batches(&self) -> EngineResult<usize> {
        self.get_parsed_or_default(config_keys::MAX_CONCURRENT_BATCHES, 1)
    }

    async fn get_heuristic_tables(&self) -> EngineResult<HeuristicTables> {
        match self.get_config_value(config_keys::HEURISTICS)? {
            None => Ok(HeuristicTables::default()),
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| ImportError::ConfigValueError {
                    key: config_keys::HEURISTICS.to_string(),
                    value: raw.chars().take(64).collect(),
                    message: e.to_string(),
                })
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 文件检查
    pub const MAX_FILE_BYTES: &str = "import.max_file_bytes";
    pub const ENCODING_SAMPLE_CHARS: &str = "import.encoding_sample_chars";

    // 执行策略
    pub const ERROR_RATE_THRESHOLD: &str = "import.error_rate_threshold";
    pub const MAX_CONCURRENT_BATCHES: &str = "import.max_concurrent_batches";

    // 启发式映射表 (JSON)
    pub const HEURISTICS: &str = "import.heuristics";
}

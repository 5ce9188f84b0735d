// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时 SQLite 数据库、共享连接上的导入器构建、CSV 测试数据
// ==========================================

#![allow(dead_code)]

use crm_importer::config::{ConfigManager, ImportSettings};
use crm_importer::db;
use crm_importer::importer::{BulkImporterImpl, KeyLocks, SchemaRegistry};
use crm_importer::repository::{SqliteActivityLogger, SqliteRecordStore};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 临时数据库上下文（NamedTempFile 需要保持存活）
pub struct TestDb {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
}

impl TestDb {
    pub fn store(&self) -> Arc<SqliteRecordStore> {
        Arc::new(SqliteRecordStore::from_connection(Arc::clone(&self.conn)).unwrap())
    }

    pub fn activity_logger(&self) -> Arc<SqliteActivityLogger> {
        Arc::new(SqliteActivityLogger::new(Arc::clone(&self.conn)))
    }

    pub fn config(&self) -> ConfigManager {
        ConfigManager::from_connection(Arc::clone(&self.conn)).unwrap()
    }
}

/// 创建临时测试数据库并初始化 schema
pub fn create_test_db() -> Result<TestDb, Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok(TestDb {
        _temp_file: temp_file,
        db_path,
        conn: Arc::new(Mutex::new(conn)),
    })
}

/// 在测试数据库上构建导入器（SQLite 存储 + SQLite 审计日志）
pub fn create_importer(test_db: &TestDb, settings: &ImportSettings) -> BulkImporterImpl {
    BulkImporterImpl::new(
        Arc::new(SchemaRegistry::with_builtin_schemas().unwrap()),
        test_db.store(),
        test_db.activity_logger(),
        settings,
    )
}

/// 构建共享主键锁的导入器
pub fn create_importer_with_locks(
    test_db: &TestDb,
    settings: &ImportSettings,
    locks: Arc<KeyLocks>,
) -> BulkImporterImpl {
    create_importer(test_db, settings).with_key_locks(locks)
}

/// 生成项目 CSV：每行一个项目，客户在 client_count 个客户间轮转
pub fn jobs_csv(rows: usize, client_count: usize) -> String {
    let mut csv = String::from("name,client_name,new_business,start_date,budget\n");
    for i in 0..rows {
        csv.push_str(&format!(
            "Job {:03},Client {:02},{},Q{}25,{}\n",
            i,
            i % client_count.max(1),
            if i % 2 == 0 { "yes" } else { "no" },
            i % 4 + 1,
            1000 + i
        ));
    }
    csv
}

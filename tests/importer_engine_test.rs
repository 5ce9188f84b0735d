// ==========================================
// 导入引擎集成测试
// ==========================================
// 测试目标: SQLite 存储上的端到端导入（解析 → 预检 → 落库 → 审计）
// ==========================================

mod test_helpers;

use crm_importer::config::{config_keys, ImportSettings};
use crm_importer::importer::{BulkImporter, BulkImporterImpl, ImportError, SchemaRegistry};
use crm_importer::logging;
use crm_importer::repository::RecordStore;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_job_import_creates_account_and_job() {
    logging::init_test();
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());
    let store = test_db.store();

    let csv = "name,client_name\nAcme Website Redesign,Acme Corporation\n";
    let result = importer
        .import_file(csv.as_bytes(), Some("text/csv"), "jobs")
        .await
        .expect("导入应返回结构化结果");

    assert!(result.success, "{}", result.message);
    assert_eq!(result.imported, 1);
    assert_eq!(result.updated, 0);
    assert_eq!(result.skipped, 0);
    assert!(result.errors.is_empty());
    assert!(result.rows_accounted());

    // 客户自动创建（警告，不计入 imported）
    assert_eq!(store.count("accounts").await.unwrap(), 1);
    assert_eq!(store.count("jobs").await.unwrap(), 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.row == 2 && w.field.as_deref() == Some("client_name")));

    let account = store
        .find_one("accounts", "name", "Acme Corporation")
        .await
        .unwrap()
        .expect("客户应已创建");
    assert_eq!(account.field_str("industry_group").as_deref(), Some("New Business"));

    let job = store
        .find_one("jobs", "name", "Acme Website Redesign")
        .await
        .unwrap()
        .expect("项目应已创建");
    assert_eq!(job.field_str("account_id"), Some(account.id));
    assert_eq!(job.field_str("team").as_deref(), Some("Digital"));
}

#[tokio::test]
async fn test_reimport_with_skip_strategy_is_idempotent() {
    logging::init_test();
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());
    let csv = test_helpers::jobs_csv(30, 4);

    let first = importer
        .import_file(csv.as_bytes(), Some("text/csv"), "jobs")
        .await
        .unwrap();
    assert_eq!(first.imported, 30);
    assert_eq!(first.summary.duplicates, 0);

    let second = importer
        .import_file(csv.as_bytes(), Some("text/csv"), "jobs")
        .await
        .unwrap();
    assert!(second.success);
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 30);
    assert_eq!(second.summary.duplicates, 30);
    assert!(second.rows_accounted());

    let store = test_db.store();
    assert_eq!(store.count("jobs").await.unwrap(), 30);
    assert_eq!(store.count("accounts").await.unwrap(), 4);
}

#[tokio::test]
async fn test_accounts_update_strategy_merges_fields() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    importer
        .import_file(
            b"name,email,status\nGlobex,INFO@GLOBEX.COM,active\n",
            Some("text/csv"),
            "accounts",
        )
        .await
        .unwrap();
    let result = importer
        .import_file(b"name,status\nGlobex,inactive\n", Some("text/csv"), "accounts")
        .await
        .unwrap();

    assert_eq!(result.updated, 1);
    assert_eq!(result.imported, 0);

    let record = test_db
        .store()
        .find_one("accounts", "name", "Globex")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.field_str("status").as_deref(), Some("inactive"));
    assert_eq!(record.field_str("email").as_deref(), Some("info@globex.com"));
}

#[tokio::test]
async fn test_row_accounting_with_mixed_rows() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    let csv = "\
email,name,role
alice@example.com,Alice,admin
not-an-email,Bob,member
carol@example.com,Carol,superuser
alice@example.com,Alice Again,member
dave@example.com,Dave,viewer
";
    let result = importer
        .import_file(csv.as_bytes(), Some("text/csv"), "users")
        .await
        .unwrap();

    assert_eq!(result.summary.total_rows, 5);
    assert_eq!(result.imported, 2);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.summary.failed_rows, 2);
    assert!(result.rows_accounted());

    let error_rows: Vec<usize> = result.errors.iter().map(|e| e.row).collect();
    assert_eq!(error_rows, vec![3, 4]);
    assert!(result.success, "2/5 失败低于默认阈值");
}

#[tokio::test]
async fn test_error_rate_threshold_from_config() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let config = test_db.config();
    config
        .set_config_value(config_keys::ERROR_RATE_THRESHOLD, "0.1")
        .unwrap();

    let importer = BulkImporterImpl::from_config(
        Arc::new(SchemaRegistry::with_builtin_schemas().unwrap()),
        test_db.store(),
        test_db.activity_logger(),
        &config,
    )
    .await
    .unwrap();

    let csv = "email\nok@example.com\nbroken\nfine@example.com\nalso@example.com\n";
    let result = importer
        .import_file(csv.as_bytes(), Some("text/csv"), "users")
        .await
        .unwrap();

    assert_eq!(result.summary.failed_rows, 1);
    assert!(!result.success, "1/4 失败超过 0.1 阈值");
}

#[tokio::test]
async fn test_import_emits_audit_event() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    importer
        .import_file(b"name\nInitech\nUmbrella\n", Some("text/csv"), "accounts")
        .await
        .unwrap();

    let events = test_db.activity_logger().list_recent(10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_type, "import");
    assert_eq!(events[0].entity_id, "accounts");
    assert_eq!(events[0].action, "bulk_import");
    assert_eq!(events[0].details["imported"], 2);
    assert_eq!(events[0].details["totalRows"], 2);
}

#[tokio::test]
async fn test_validate_file_reports_without_writing() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    let result = importer
        .validate_file(
            b"name,client_name\nSite Build,Acme\n,Acme\n",
            Some("text/csv"),
            "jobs",
        )
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.summary.valid_rows, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 3);
    assert_eq!(test_db.store().count("jobs").await.unwrap(), 0);
    assert!(test_db.activity_logger().list_recent(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_input_is_not_success() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    let result = importer.execute_import(&[], "accounts").await.unwrap();
    assert!(!result.success);
    assert_eq!(result.summary.total_rows, 0);
    assert!(result.rows_accounted());
}

#[tokio::test]
async fn test_import_path_file_level_errors() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    let missing = importer
        .import_path(std::path::Path::new("/nonexistent/accounts.csv"), "accounts")
        .await;
    assert!(matches!(missing, Err(ImportError::FileNotFound(_))));

    let mut pdf = NamedTempFile::with_suffix(".pdf").unwrap();
    pdf.write_all(b"%PDF-1.4").unwrap();
    let unsupported = importer.import_path(pdf.path(), "accounts").await;
    assert!(matches!(unsupported, Err(ImportError::UnsupportedFormat(_))));

    let mut empty = NamedTempFile::with_suffix(".csv").unwrap();
    empty.write_all(b"\xEF\xBB\xBF").unwrap();
    let empty_result = importer.import_path(empty.path(), "accounts").await;
    assert!(matches!(empty_result, Err(ImportError::EmptyFile)));
}

#[tokio::test]
async fn test_file_too_large_from_settings() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let settings = ImportSettings {
        max_file_bytes: 16,
        ..ImportSettings::default()
    };
    let importer = test_helpers::create_importer(&test_db, &settings);

    let result = importer
        .import_file(
            b"name\nA very long account name\n",
            Some("text/csv"),
            "accounts",
        )
        .await;
    assert!(matches!(result, Err(ImportError::FileTooLarge { .. })));
}

#[tokio::test]
async fn test_template_round_trip_import() {
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());

    let template = importer.generate_template("accounts").unwrap();
    let result = importer
        .import_file(template.as_bytes(), Some("text/csv"), "accounts")
        .await
        .unwrap();

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.imported, 1);
}

#[tokio::test]
async fn test_hash_prefixed_row_after_header_is_imported() {
    logging::init_test();
    let test_db = test_helpers::create_test_db().expect("Failed to create test db");
    let importer = test_helpers::create_importer(&test_db, &ImportSettings::default());
    let store = test_db.store();

    let csv = "# 必填字段: name\nname,email\nAcme,a@acme.com\n#1 Digital Agency,hi@one.com\n,missing@name.com\n";
    let result = importer
        .import_file(csv.as_bytes(), Some("text/csv"), "accounts")
        .await
        .unwrap();

    assert_eq!(result.summary.total_rows, 3);
    assert_eq!(result.imported, 2);
    assert!(result.rows_accounted());

    // 第 4 行是 '#' 开头的数据行，空名称行因此是第 5 行
    let error_rows: Vec<usize> = result.errors.iter().map(|e| e.row).collect();
    assert_eq!(error_rows, vec![5]);

    assert!(store
        .find_one("accounts", "name", "#1 Digital Agency")
        .await
        .unwrap()
        .is_some());
}

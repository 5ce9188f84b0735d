// ==========================================
// 预检流程测试
// ==========================================
// 测试目标: 别名恢复、逐行错误定位、季度日期、行业分组推断
// ==========================================

use crm_importer::config::HeuristicTables;
use crm_importer::importer::{
    BulkImporter, BulkImporterImpl, RuleValidator, SchemaRegistry, SchemaRowTransformer,
    ValidationPass,
};
use crm_importer::repository::{InMemoryRecordStore, TracingActivityLogger};
use crm_importer::{ImportSettings, Row};
use std::sync::Arc;

fn pass(tables: &Arc<HeuristicTables>) -> ValidationPass {
    ValidationPass::new(
        Arc::new(SchemaRowTransformer::new(Arc::clone(tables))),
        Arc::new(RuleValidator),
    )
}

fn importer() -> BulkImporterImpl {
    BulkImporterImpl::new(
        Arc::new(SchemaRegistry::with_builtin_schemas().unwrap()),
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(TracingActivityLogger),
        &ImportSettings::default(),
    )
}

fn row(cells: &[(&str, &str)]) -> Row {
    cells
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_every_account_name_alias_recovers_required_name() {
    let tables = HeuristicTables::default();
    let importer = importer();

    for alias in tables.aliases_for("accounts", "name") {
        let rows = vec![row(&[("name", ""), (alias.as_str(), "Initech")])];
        let result = importer.validate_data(&rows, "accounts").await.unwrap();

        assert!(result.success, "别名 {} 应恢复 name", alias);
        assert_eq!(result.summary.valid_rows, 1);
        assert!(result.errors.is_empty());
    }
}

#[tokio::test]
async fn test_every_job_client_alias_recovers_client_name() {
    let tables = HeuristicTables::default();
    let importer = importer();

    for alias in tables.aliases_for("jobs", "client_name") {
        let rows = vec![row(&[("name", "Brand Refresh"), (alias.as_str(), "Globex")])];
        let result = importer.validate_data(&rows, "jobs").await.unwrap();

        assert!(result.success, "别名 {} 应恢复 client_name", alias);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field.as_deref() == Some("client_name")));
    }
}

#[tokio::test]
async fn test_missing_required_without_alias_is_one_error_at_display_row() {
    let importer = importer();
    let rows = vec![
        row(&[("email", "a@example.com")]),
        row(&[("email", "b@example.com")]),
        row(&[("email", ""), ("name", "No Email")]),
    ];

    let result = importer.validate_data(&rows, "users").await.unwrap();

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 4);
    assert_eq!(result.errors[0].field.as_deref(), Some("email"));
}

#[test]
fn test_quarter_dates_through_jobs_pipeline() {
    let tables = Arc::new(HeuristicTables::default());
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let schema = registry.get("jobs").unwrap();
    let pass = pass(&tables);

    let cases = [
        ("Q125", "2025-01-01"),
        ("Q3 24", "2024-07-01"),
        ("q4-2023", "2023-10-01"),
        ("2024-05-17", "2024-05-17"),
        ("TBC", ""),
        ("Opportunity", ""),
    ];

    for (idx, (input, expected)) in cases.iter().enumerate() {
        let raw = row(&[("name", "Campaign"), ("client_name", "Acme"), ("start_date", *input)]);
        let checked = pass.check_row(&raw, &schema, idx);

        assert!(checked.is_valid(), "{} 应通过校验", input);
        assert_eq!(checked.row.value("start_date"), *expected, "输入 {}", input);
    }
}

#[test]
fn test_unparseable_date_is_cleared_with_warning() {
    let tables = Arc::new(HeuristicTables::default());
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let schema = registry.get("jobs").unwrap();

    let raw = row(&[("name", "Campaign"), ("client_name", "Acme"), ("start_date", "Q5 25")]);
    let checked = pass(&tables).check_row(&raw, &schema, 0);

    assert!(checked.is_valid());
    assert_eq!(checked.row.value("start_date"), "");
    assert!(checked
        .warnings
        .iter()
        .any(|w| w.field.as_deref() == Some("start_date") && w.row == 2));
}

#[test]
fn test_industry_group_through_accounts_pipeline() {
    let tables = Arc::new(HeuristicTables::default());
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let schema = registry.get("accounts").unwrap();
    let pass = pass(&tables);

    let cases = [
        ("Melbourne University", "UNIV01", "Education & Non-Profit"),
        ("Acme Tech", "TECH", "Technology"),
        ("Zenith", "ZZQ", "New Business"),
        ("Nameless", "", "New Business"),
    ];

    for (name, code, expected) in cases {
        let raw = row(&[("name", name), ("short_code", code)]);
        let checked = pass.check_row(&raw, &schema, 0);

        assert!(checked.is_valid(), "{} 应通过校验", name);
        assert_eq!(checked.row.value("industry_group"), expected, "简码 {}", code);
        assert_eq!(checked.row.value("legal_name"), name);
    }
}

#[test]
fn test_explicit_values_are_not_overwritten_by_auto_fill() {
    let tables = Arc::new(HeuristicTables::default());
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let schema = registry.get("accounts").unwrap();

    let raw = row(&[
        ("name", "Acme University"),
        ("industry", "Research"),
        ("industry_group", "Custom Group"),
    ]);
    let checked = pass(&tables).check_row(&raw, &schema, 0);

    assert_eq!(checked.row.value("industry"), "Research");
    assert_eq!(checked.row.value("industry_group"), "Custom Group");
}

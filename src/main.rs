// ==========================================
// CRM 批量导入引擎 - 命令行入口
// ==========================================
// 命令: validate（预检）/ import（导入）/ template（导出模板）/ schemas（列出 schema）
// 输出: 导入报告以 JSON 打印到 stdout，日志输出到 stderr
// ==========================================

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crm_importer::config::ConfigManager;
use crm_importer::db;
use crm_importer::importer::{generate_template, BulkImporter, BulkImporterImpl, SchemaRegistry};
use crm_importer::logging;
use crm_importer::repository::{SqliteActivityLogger, SqliteRecordStore};
use crm_importer::ImportResult;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "crm-importer", version, about = "CRM 批量导入引擎")]
struct Cli {
    /// SQLite 数据库路径（默认位于用户数据目录）
    #[arg(long, global = true, env = "CRM_IMPORTER_DB_PATH")]
    db: Option<PathBuf>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 预检文件，不写入存储
    Validate(FileArgs),
    /// 导入文件
    Import(FileArgs),
    /// 导出 schema 对应的导入模板
    Template {
        /// schema 名称（accounts / jobs / users）
        schema: String,
        /// 输出文件（默认 stdout）
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// 列出已注册的 schema
    Schemas,
}

#[derive(Args)]
struct FileArgs {
    /// schema 名称（accounts / jobs / users）
    #[arg(long, short)]
    schema: String,

    /// 待导入文件（.csv / .txt）
    file: PathBuf,

    /// 声明的内容类型（如 text/csv），缺省时按扩展名推断
    #[arg(long)]
    content_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    tracing::info!(version = crm_importer::VERSION, "{}", crm_importer::APP_NAME);

    let registry = Arc::new(SchemaRegistry::with_builtin_schemas()?);

    match cli.command {
        Commands::Schemas => {
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Template { schema, output } => {
            let template = generate_template(&*registry.get(&schema)?)?;
            match output {
                Some(path) => std::fs::write(&path, template)
                    .with_context(|| format!("无法写入模板文件: {}", path.display()))?,
                None => print!("{}", template),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate(args) => {
            let importer = build_importer(cli.db, registry).await?;
            let result = run_file(&importer, &args, false).await?;
            report(&result)
        }
        Commands::Import(args) => {
            let importer = build_importer(cli.db, registry).await?;
            let result = run_file(&importer, &args, true).await?;
            report(&result)
        }
    }
}

async fn build_importer(
    db_path: Option<PathBuf>,
    registry: Arc<SchemaRegistry>,
) -> Result<BulkImporterImpl> {
    let db_path = db_path.unwrap_or_else(default_db_path);
    tracing::info!(db = %db_path.display(), "使用数据库");

    let db_path_str = db_path.to_string_lossy();
    let conn = db::open_sqlite_connection(&db_path_str)
        .with_context(|| format!("无法打开数据库: {}", db_path.display()))?;
    db::init_schema(&conn).context("数据库建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(Arc::clone(&conn))?;
    let store = Arc::new(SqliteRecordStore::from_connection(Arc::clone(&conn))?);
    let activity_logger = Arc::new(SqliteActivityLogger::new(conn));

    let importer = BulkImporterImpl::from_config(registry, store, activity_logger, &config).await?;
    Ok(importer)
}

async fn run_file(importer: &BulkImporterImpl, args: &FileArgs, commit: bool) -> Result<ImportResult> {
    let result = match (&args.content_type, commit) {
        (None, false) => importer.validate_path(&args.file, &args.schema).await?,
        (None, true) => importer.import_path(&args.file, &args.schema).await?,
        (Some(content_type), _) => {
            let bytes = read_file(&args.file).await?;
            if commit {
                importer
                    .import_file(&bytes, Some(content_type.as_str()), &args.schema)
                    .await?
            } else {
                importer
                    .validate_file(&bytes, Some(content_type.as_str()), &args.schema)
                    .await?
            }
        }
    };
    Ok(result)
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("无法读取文件: {}", path.display()))
}

fn report(result: &ImportResult) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

/// 默认数据库路径
///
/// 优先使用用户数据目录；获取失败时回退到当前目录
fn default_db_path() -> PathBuf {
    let mut path = PathBuf::from("./crm_importer.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("crm-importer");
        // 目录创建失败时后续打开数据库会报告具体错误
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("crm_importer.db");
    }

    path
}

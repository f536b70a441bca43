// ==========================================
// 非营利运营平台 - CSV 导入命令行入口
// ==========================================
// 用法:
//   nonprofit-import donors ./donors.csv
//   nonprofit-import sales_orders ./orders.csv --batch-size 100 --error-log errors.txt
//   nonprofit-import invoices ./invoices.csv --dry-run --json
// ==========================================

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nonprofit_import::config::{ConfigManager, ImportConfigReader, ImportSettings};
use nonprofit_import::db::{default_db_path, open_and_init};
use nonprofit_import::domain::{ImportKind, ImportResult};
use nonprofit_import::importer::{write_error_log, ImportOrchestrator, LogProgress, RecordImporter};
use nonprofit_import::repository::{InMemoryRecordStore, RecordStore, SqliteRecordStore};
use nonprofit_import::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

/// Import a third-party CSV export into the nonprofit record store.
#[derive(Parser, Debug)]
#[command(name = "nonprofit-import")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Import kind: donors, sales_orders, invoices, companies, partners
    #[arg(value_name = "KIND")]
    kind: ImportKind,

    /// CSV file to import
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// SQLite database path (default: user data dir, or NONPROFIT_IMPORT_DB_PATH)
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// Records per insert batch (overrides stored config for this run)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write one line per row error to this file
    #[arg(long, value_name = "PATH")]
    error_log: Option<PathBuf>,

    /// Reconcile against an empty in-memory store; nothing is written
    #[arg(long)]
    dry_run: bool,

    /// Print the import result as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Locale for row error messages (en, zh-CN)
    #[arg(long)]
    locale: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    match run(&args).await {
        Ok(result) if result.success_count == 0 && result.failure_count == 0 && result.has_errors() => {
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: &Args) -> Result<ImportResult> {
    tracing::info!(version = nonprofit_import::VERSION, kind = %args.kind, file = %args.file.display(), "启动导入");

    let db_path = args.db.clone().unwrap_or_else(default_db_path);
    let conn = open_and_init(&db_path).with_context(|| format!("无法打开数据库 {}", db_path))?;
    let conn = Arc::new(Mutex::new(conn));
    let config = ConfigManager::from_connection(conn.clone()).map_err(|e| anyhow!(e))?;

    // 语言在导入开始时由 orchestrator 按 settings 切换
    let settings = load_settings(&config, args).await?;

    let result = if args.dry_run {
        tracing::info!("演练模式: 使用内存记录库");
        execute(InMemoryRecordStore::new(), settings, args).await
    } else {
        tracing::info!(db = %db_path, "使用数据库");
        let store = SqliteRecordStore::from_connection(conn).context("无法初始化记录库")?;
        execute(store, settings, args).await
    };

    if let Some(path) = &args.error_log {
        write_error_log(&result, path)
            .await
            .with_context(|| format!("无法写入错误日志 {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "imported: {}  failed: {}  duplicates: {}",
            result.success_count, result.failure_count, result.duplicate_count
        );
        for error in result.errors.iter().take(20) {
            println!("  {}", error);
        }
        if result.errors.len() > 20 {
            println!("  ... {} more", result.errors.len() - 20);
        }
    }
    Ok(result)
}

/// 持久化配置 + 命令行覆盖 → 本次导入配置
async fn load_settings(config: &ConfigManager, args: &Args) -> Result<ImportSettings> {
    let batch_size = match args.batch_size {
        Some(size) => size,
        None => config.get_batch_size().await.map_err(|e| anyhow!(e))?,
    };
    let prefix = config.get_customer_code_prefix().await.map_err(|e| anyhow!(e))?;
    let locale = match &args.locale {
        Some(locale) => locale.clone(),
        None => config.get_locale().await.map_err(|e| anyhow!(e))?,
    };

    let mut settings = ImportSettings::new()
        .with_batch_size(batch_size)
        .with_customer_code_prefix(prefix)
        .with_locale(locale);
    let aliases = config.get_alias_overrides(args.kind).await.map_err(|e| anyhow!(e))?;
    for (field, headers) in aliases {
        for header in headers {
            settings = settings.with_alias(args.kind, &field, &header);
        }
    }
    Ok(settings)
}

async fn execute<S: RecordStore>(store: S, settings: ImportSettings, args: &Args) -> ImportResult {
    let orchestrator = ImportOrchestrator::new(store, settings);
    let mut progress = LogProgress::new(args.file.display().to_string());
    match orchestrator.import_file(args.kind, &args.file, &mut progress).await {
        Ok(result) => result,
        Err(e) => ImportResult::fatal(e.user_message()),
    }
}

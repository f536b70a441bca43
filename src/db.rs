// ==========================================
// 非营利运营平台 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表（配置表 + 导入落库表），幂等
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 显式指定数据库路径的环境变量
pub const DB_PATH_ENV: &str = "NONPROFIT_IMPORT_DB_PATH";

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 NONPROFIT_IMPORT_DB_PATH（非空时）
/// - 否则: 用户数据目录/nonprofit-import/nonprofit_import.db
/// - 取不到用户数据目录时: ./nonprofit_import.db
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./nonprofit_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("nonprofit-import");
        // 目录创建失败时退回当前目录，由 open 报告真实错误
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("nonprofit_import.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（IF NOT EXISTS，可重复调用）
///
/// # 表
/// - config_scope / config_kv: 部署级导入配置
/// - entity_record: 客户/捐赠人/企业/合作伙伴（JSON 载荷 + 自然键列）
/// - document_header / document_line: 订单与发票
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS entity_record (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            primary_key TEXT NOT NULL,
            secondary_key TEXT,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (kind, primary_key)
        );

        CREATE INDEX IF NOT EXISTS idx_entity_record_secondary
            ON entity_record (kind, secondary_key);

        CREATE TABLE IF NOT EXISTS document_header (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            document_number TEXT NOT NULL,
            customer_id TEXT NOT NULL REFERENCES entity_record(id),
            total TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS document_line (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id TEXT NOT NULL REFERENCES document_header(id) ON DELETE CASCADE,
            line_number INTEGER NOT NULL,
            payload TEXT NOT NULL
        );
        "#,
    )
}

/// 打开连接并确保表结构存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

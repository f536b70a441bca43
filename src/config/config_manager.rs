// ==========================================
// 非营利运营平台 - 配置管理器
// ==========================================
// 职责: 导入配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{
    ConfigError, ImportConfigReader, DEFAULT_BATCH_SIZE, DEFAULT_CUSTOMER_CODE_PREFIX,
    DEFAULT_LOCALE,
};
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::ImportKind;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ConfigError> {
        Ok(self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?)
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 写入某字段的附加列名别名（JSON 字符串数组）
    pub fn set_alias_override(
        &self,
        kind: ImportKind,
        field: &str,
        headers: &[&str],
    ) -> Result<(), ConfigError> {
        let value = serde_json::to_string(headers)?;
        self.set_global_config_value(&config_keys::alias_key(kind, field), &value)
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> Result<usize, ConfigError> {
        let value = self.get_config_or_default(
            config_keys::BATCH_SIZE,
            &DEFAULT_BATCH_SIZE.to_string(),
        )?;
        Ok(value.trim().parse::<usize>().unwrap_or(DEFAULT_BATCH_SIZE).max(1))
    }

    async fn get_customer_code_prefix(&self) -> Result<String, ConfigError> {
        let value =
            self.get_config_or_default(config_keys::CUSTOMER_CODE_PREFIX, DEFAULT_CUSTOMER_CODE_PREFIX)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(DEFAULT_CUSTOMER_CODE_PREFIX.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    async fn get_locale(&self) -> Result<String, ConfigError> {
        self.get_config_or_default(config_keys::LOCALE, DEFAULT_LOCALE)
    }

    async fn get_alias_overrides(
        &self,
        kind: ImportKind,
    ) -> Result<HashMap<String, Vec<String>>, ConfigError> {
        let prefix = config_keys::alias_prefix(kind);
        let rows: Vec<(String, String)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT key, value FROM config_kv
                 WHERE scope_id = 'global' AND substr(key, 1, length(?1)) = ?1
                 ORDER BY key",
            )?;
            let rows = stmt
                .query_map(params![prefix], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut overrides = HashMap::new();
        for (key, raw) in rows {
            let field = key[prefix.len()..].to_string();
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(headers) => {
                    overrides.insert(field, headers);
                }
                Err(e) => {
                    // 非法配置不阻断导入，退回内置别名
                    warn!(key = %key, error = %e, "别名配置不是 JSON 字符串数组，已忽略");
                }
            }
        }
        Ok(overrides)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::ImportKind;

    pub const BATCH_SIZE: &str = "import/batch_size";
    pub const CUSTOMER_CODE_PREFIX: &str = "import/customer_code_prefix";
    pub const LOCALE: &str = "import/locale";

    /// import/aliases/<kind>/
    pub fn alias_prefix(kind: ImportKind) -> String {
        format!("import/aliases/{}/", kind.as_str())
    }

    /// import/aliases/<kind>/<field>
    pub fn alias_key(kind: ImportKind, field: &str) -> String {
        format!("{}{}", alias_prefix(kind), field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn temp_manager() -> (NamedTempFile, ConfigManager) {
        let file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(file.path().to_str().unwrap()).unwrap();
        (file, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let (_file, manager) = temp_manager();
        assert_eq!(manager.get_batch_size().await.unwrap(), 50);
        assert_eq!(manager.get_customer_code_prefix().await.unwrap(), "CUST");
        assert_eq!(manager.get_locale().await.unwrap(), "en");
    }

    #[tokio::test]
    async fn test_invalid_batch_size_falls_back() {
        let (_file, manager) = temp_manager();
        manager
            .set_global_config_value(config_keys::BATCH_SIZE, "lots")
            .unwrap();
        assert_eq!(manager.get_batch_size().await.unwrap(), 50);

        manager
            .set_global_config_value(config_keys::BATCH_SIZE, "0")
            .unwrap();
        assert_eq!(manager.get_batch_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_alias_overrides_scoped_by_kind() {
        let (_file, manager) = temp_manager();
        manager
            .set_alias_override(ImportKind::Donors, "email", &["Correo"])
            .unwrap();
        manager
            .set_alias_override(ImportKind::Partners, "name", &["Org"])
            .unwrap();
        manager
            .set_global_config_value(&config_keys::alias_key(ImportKind::Donors, "phone"), "oops")
            .unwrap();

        let overrides = manager.get_alias_overrides(ImportKind::Donors).await.unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["email"], vec!["Correo"]);
    }
}

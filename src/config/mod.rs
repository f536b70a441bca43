// ==========================================
// 非营利运营平台 - 配置层
// ==========================================
// 职责: 导入配置（批大小、列名别名、客户编码前缀、语言）
// 存储: config_kv 表 / 进程内覆写
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{
    ConfigError, ImportConfigReader, ImportSettings, DEFAULT_BATCH_SIZE,
    DEFAULT_CUSTOMER_CODE_PREFIX, DEFAULT_LOCALE,
};

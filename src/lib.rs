// ==========================================
// 非营利运营平台 - CSV 批量导入引擎 核心库
// ==========================================
// 职责: 第三方 CSV 导出 → 规范记录库
// 范围: 捐赠人 / 销售订单 / 发票 / 企业 / 合作伙伴
// 红线: 存储引擎、UI、认证均为外部协作方，只通过 RecordStore 访问
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 行/记录/结果类型
pub mod domain;

// 数据仓储层 - 记录库协作接口与适配器
pub mod repository;

// 导入层 - 解析/映射/校验/对账/写入
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（SQLite 连接与建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    DocumentGroup, EntityKey, EntityRecord, ImportKind, ImportPhase, ImportResult, RawRow,
    RowError,
};

pub use importer::{ImportError, ImportOrchestrator, ProgressSink, RecordImporter};

pub use repository::{InMemoryRecordStore, RecordStore, RepositoryError, SqliteRecordStore};

pub use config::{ConfigManager, ImportConfigReader, ImportSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "nonprofit-import";

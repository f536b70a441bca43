// ==========================================
// 非营利运营平台 - 数据仓储层
// ==========================================
// 红线: Repository 不含导入规则
// ==========================================
// 职责: 提供记录库接口,屏蔽存储细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod memory_store;
pub mod record_store;
pub mod sqlite_store;

pub use error::{RepositoryError, RepositoryResult};
pub use memory_store::{InMemoryRecordStore, StoredDocument};
pub use record_store::RecordStore;
pub use sqlite_store::SqliteRecordStore;

// ==========================================
// 非营利运营平台 - 导入层
// ==========================================
// 管道: 分词 → 列绑定 → 规范化 → 校验 → 实体解析 → 分组 → 批量写入
// ==========================================
// 职责: 第三方 CSV 导出 → 规范记录
// 支持: 捐赠人 / 销售订单 / 发票 / 企业 / 合作伙伴
// ==========================================

// 模块声明
pub mod batch_writer;
pub mod column_resolver;
pub mod donor_merge;
pub mod entity_resolver;
pub mod error;
pub mod error_log;
pub mod field_normalizer;
pub mod grouper;
pub mod importer_trait;
pub mod orchestrator;
pub mod profiles;
pub mod progress;
pub mod row_validator;
pub mod tokenizer;

// 重导出核心类型
pub use batch_writer::{BatchWriter, DocumentWrite, UpdateUnit, WriteUnit};
pub use column_resolver::{AliasTable, ColumnResolver};
pub use entity_resolver::{EntityCache, EntityResolver};
pub use error::ImportError;
pub use error_log::write_error_log;
pub use field_normalizer::FieldNormalizer;
pub use grouper::Grouper;
pub use orchestrator::{ImportOrchestrator, PhaseTracker};
pub use progress::{LogProgress, NoopProgress, ProgressSink, ProgressTracker};
pub use row_validator::RowValidator;
pub use tokenizer::CsvTokenizer;

// 重导出 Trait 接口
pub use importer_trait::RecordImporter;

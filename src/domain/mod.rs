// ==========================================
// 非营利运营平台 - 领域模型层
// ==========================================
// 职责: 定义导入管道的行、记录、结果类型
// 红线: 不含数据访问逻辑，不含导入流程逻辑
// ==========================================

pub mod fields;
pub mod import;
pub mod record;
pub mod row;
pub mod types;

// 重导出核心类型
pub use fields::{
    CanonicalField, CompanyField, DonorField, InvoiceField, PartnerField, SalesOrderField,
};
pub use import::{DocumentGroup, ImportResult, RowError};
pub use record::{
    CompanyRecord, CustomerRecord, DocumentHeader, DonorRecord, EntityKey, EntityRecord,
    InvoiceHeader, LineItem, PartnerRecord, SalesOrderHeader, StoredEntity,
};
pub use row::{CanonicalRow, DraftRow, FieldValue, RawRow};
pub use types::{DocumentKind, EntityKind, FieldKind, ImportKind, ImportPhase};

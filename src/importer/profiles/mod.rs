// ==========================================
// 非营利运营平台 - 导入种类配置（Profile）
// ==========================================
// 每个导入种类一个 Profile:
// - 规范字段枚举 + 内置列名别名（按优先级）
// - 必填字段（按校验顺序）与邮箱格式字段
// - 派生值（规范化之后、校验之前）
// - 规范行 → 类型化记录
// ==========================================

pub mod companies;
pub mod donors;
pub mod invoices;
pub mod partners;
pub mod sales_orders;

use crate::domain::{
    CanonicalField, CanonicalRow, DocumentHeader, EntityKind, EntityRecord, ImportKind, LineItem,
};
use rust_decimal::Decimal;

pub use companies::CompanyProfile;
pub use donors::DonorProfile;
pub use invoices::InvoiceProfile;
pub use partners::PartnerProfile;
pub use sales_orders::SalesOrderProfile;

// ==========================================
// ImportProfile - 所有导入种类共有
// ==========================================
pub trait ImportProfile: Send + Sync + 'static {
    type Field: CanonicalField;

    const KIND: ImportKind;

    /// 内置候选列名（优先级从高到低，大小写敏感）
    fn aliases(field: Self::Field) -> &'static [&'static str];

    /// 必填字段（声明顺序即校验顺序）
    fn required() -> &'static [Self::Field];

    /// 需做邮箱格式校验的字段（仅在有值时校验）
    fn email_fields() -> &'static [Self::Field] {
        &[]
    }

    /// 派生值（默认无）
    fn derive(_row: &mut CanonicalRow<Self::Field>) {}
}

// ==========================================
// FlatProfile - 一行一条记录
// ==========================================
pub trait FlatProfile: ImportProfile {
    const ENTITY: EntityKind;

    fn to_record(row: &CanonicalRow<Self::Field>) -> EntityRecord;
}

// ==========================================
// DocumentProfile - 单头 + 明细（一行一个明细）
// ==========================================

/// 行中引用的客户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRef {
    pub name: String,
    pub code: Option<String>,
    pub email: Option<String>,
}

pub trait DocumentProfile: ImportProfile {
    fn document_number(row: &CanonicalRow<Self::Field>) -> Option<String>;

    fn customer(row: &CanonicalRow<Self::Field>) -> Option<CustomerRef>;

    /// 明细（line_number 为单据内序号，1 起）
    fn line(row: &CanonicalRow<Self::Field>, line_number: usize) -> LineItem;

    /// 单头（单头字段取分组首行）
    fn header(
        first: &CanonicalRow<Self::Field>,
        document_number: &str,
        customer_id: &str,
        total: Decimal,
    ) -> DocumentHeader;
}

/// 明细金额: 缺失时 = 数量 × 单价；数量缺失按 1
pub(crate) fn line_amounts(
    quantity: Option<Decimal>,
    unit_price: Option<Decimal>,
    amount: Option<Decimal>,
) -> (Decimal, Decimal, Decimal) {
    let quantity = quantity.unwrap_or(Decimal::ONE);
    let unit_price = unit_price.unwrap_or(Decimal::ZERO);
    let amount = amount.unwrap_or(quantity * unit_price);
    (quantity, unit_price, amount)
}

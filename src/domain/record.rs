// ==========================================
// 非营利运营平台 - 记录模型
// ==========================================
// 用途: 导入层构造、记录库持久化的类型化记录
// 说明: 每个导入种类一个带标签的记录变体，不共用松散结构体
// ==========================================

use crate::domain::types::{DocumentKind, EntityKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// EntityKey - 自然键（仅用于运行内去重与查找）
// ==========================================
// 红线: 不是存储主键，不对外暴露
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    /// 规范化: 去首尾空白、内部空白折叠、转小写
    pub fn normalized(raw: &str) -> Self {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        Self(collapsed.to_lowercase())
    }

    /// 复合自然键（如 合作伙伴名称 + 邮编）
    pub fn compound(parts: &[&str]) -> Self {
        let joined = parts
            .iter()
            .map(|p| Self::normalized(p).0)
            .collect::<Vec<_>>()
            .join("|");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// 实体记录
// ==========================================

/// 客户（订单/发票通过客户名称引用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    /// 唯一次级标识；源文件未提供时自动生成
    pub customer_code: String,
    pub email: Option<String>,
}

/// 捐赠人
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorRecord {
    pub name: String,
    pub email: String,
    pub alt_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub donor_type: Option<String>,
    pub first_donation_date: Option<NaiveDate>,
    pub last_donation_date: Option<NaiveDate>,
    pub total_donated: Option<Decimal>,
    pub is_recurring: Option<bool>,
    pub email_opt_in: Option<bool>,
    pub notes: Option<String>,
}

/// 企业
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

/// 合作伙伴
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerRecord {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub partner_type: Option<String>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

// ==========================================
// EntityRecord - 实体记录变体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRecord {
    Customer(CustomerRecord),
    Donor(DonorRecord),
    Company(CompanyRecord),
    Partner(PartnerRecord),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Customer(_) => EntityKind::Customer,
            EntityRecord::Donor(_) => EntityKind::Donor,
            EntityRecord::Company(_) => EntityKind::Company,
            EntityRecord::Partner(_) => EntityKind::Partner,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            EntityRecord::Customer(c) => &c.name,
            EntityRecord::Donor(d) => &d.name,
            EntityRecord::Company(c) => &c.name,
            EntityRecord::Partner(p) => &p.name,
        }
    }

    /// 主自然键
    ///
    /// - 客户/企业: 名称
    /// - 捐赠人: 主邮箱
    /// - 合作伙伴: 名称 + 邮编
    pub fn primary_key(&self) -> EntityKey {
        match self {
            EntityRecord::Customer(c) => EntityKey::normalized(&c.name),
            EntityRecord::Donor(d) => EntityKey::normalized(&d.email),
            EntityRecord::Company(c) => EntityKey::normalized(&c.name),
            EntityRecord::Partner(p) => {
                EntityKey::compound(&[&p.name, p.postal_code.as_deref().unwrap_or("")])
            }
        }
    }

    /// 次级自然键（目前仅捐赠人备用邮箱）
    pub fn secondary_key(&self) -> Option<EntityKey> {
        match self {
            EntityRecord::Donor(d) => d
                .alt_email
                .as_deref()
                .map(EntityKey::normalized)
                .filter(|k| !k.is_empty()),
            _ => None,
        }
    }

    /// 全部自然键（主键在前）
    pub fn natural_keys(&self) -> Vec<EntityKey> {
        let mut keys = vec![self.primary_key()];
        if let Some(secondary) = self.secondary_key() {
            if !keys.contains(&secondary) {
                keys.push(secondary);
            }
        }
        keys
    }
}

/// 记录库中已存在的实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub id: String,
    pub record: EntityRecord,
}

// ==========================================
// 单据（单头 + 明细）
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderHeader {
    pub order_number: String,
    pub customer_id: String,
    pub order_date: Option<NaiveDate>,
    pub shipment_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    pub invoice_number: String,
    pub customer_id: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub is_paid: bool,
    pub notes: Option<String>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentHeader {
    SalesOrder(SalesOrderHeader),
    Invoice(InvoiceHeader),
}

impl DocumentHeader {
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentHeader::SalesOrder(_) => DocumentKind::SalesOrder,
            DocumentHeader::Invoice(_) => DocumentKind::Invoice,
        }
    }

    pub fn document_number(&self) -> &str {
        match self {
            DocumentHeader::SalesOrder(h) => &h.order_number,
            DocumentHeader::Invoice(h) => &h.invoice_number,
        }
    }

    pub fn customer_id(&self) -> &str {
        match self {
            DocumentHeader::SalesOrder(h) => &h.customer_id,
            DocumentHeader::Invoice(h) => &h.customer_id,
        }
    }

    pub fn total(&self) -> Decimal {
        match self {
            DocumentHeader::SalesOrder(h) => h.total,
            DocumentHeader::Invoice(h) => h.total,
        }
    }
}

/// 单据明细（订单/发票共用）
///
/// 同一单据内即使两行引用同一品项也各自独立，不合并数量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// 单据内序号（1 起，等于源文件出现顺序）
    pub line_number: usize,
    pub item_name: String,
    pub sku: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    /// 源文件行号
    pub source_row: usize,
}

// ==========================================
// 非营利运营平台 - 领域类型定义
// ==========================================
// 职责: 导入种类 / 实体种类 / 字段值类型 / 导入阶段
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// ImportKind - 导入种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Donors,      // 捐赠人（合并策略）
    SalesOrders, // 销售订单（单头 + 明细）
    Invoices,    // 发票（单头 + 明细）
    Companies,   // 企业（建或跳过）
    Partners,    // 合作伙伴（建或跳过）
}

impl ImportKind {
    pub const ALL: [ImportKind; 5] = [
        ImportKind::Donors,
        ImportKind::SalesOrders,
        ImportKind::Invoices,
        ImportKind::Companies,
        ImportKind::Partners,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Donors => "donors",
            ImportKind::SalesOrders => "sales_orders",
            ImportKind::Invoices => "invoices",
            ImportKind::Companies => "companies",
            ImportKind::Partners => "partners",
        }
    }

    /// 是否为“单头 + 多明细”的分组导入
    pub fn is_grouped(&self) -> bool {
        matches!(self, ImportKind::SalesOrders | ImportKind::Invoices)
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "donors" | "donor" => Ok(ImportKind::Donors),
            "sales_orders" | "orders" | "sales_order" => Ok(ImportKind::SalesOrders),
            "invoices" | "invoice" => Ok(ImportKind::Invoices),
            "companies" | "company" => Ok(ImportKind::Companies),
            "partners" | "partner" => Ok(ImportKind::Partners),
            other => Err(format!("未知导入种类: {}", other)),
        }
    }
}

// ==========================================
// EntityKind - 被引用/去重的实体种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Donor,
    Company,
    Partner,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Donor => "donor",
            EntityKind::Company => "company",
            EntityKind::Partner => "partner",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(EntityKind::Customer),
            "donor" => Ok(EntityKind::Donor),
            "company" => Ok(EntityKind::Company),
            "partner" => Ok(EntityKind::Partner),
            other => Err(format!("未知实体种类: {}", other)),
        }
    }
}

// ==========================================
// DocumentKind - 单据种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SalesOrder,
    Invoice,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "sales_order",
            DocumentKind::Invoice => "invoice",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// FieldKind - 规范字段的值类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    Date,
    Bool,
}

// ==========================================
// ImportPhase - 单次导入的状态机
// ==========================================
// 顺序: Parsing → ResolvingEntities → Grouping(可选) → Writing → Done
// 红线: 只进不退
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImportPhase {
    Parsing,
    ResolvingEntities,
    Grouping,
    Writing,
    Done,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Parsing => "parsing",
            ImportPhase::ResolvingEntities => "resolving_entities",
            ImportPhase::Grouping => "grouping",
            ImportPhase::Writing => "writing",
            ImportPhase::Done => "done",
        };
        f.write_str(name)
    }
}

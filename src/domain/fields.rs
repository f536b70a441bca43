// ==========================================
// 非营利运营平台 - 规范字段定义
// ==========================================
// 职责: 每个导入种类一个封闭的规范字段枚举
// 说明: 规范字段名与源文件列名无关，列名 → 字段由别名表决定
// ==========================================

use crate::domain::types::FieldKind;
use std::fmt;
use std::hash::Hash;

/// 规范字段（每个导入种类一个实现）
pub trait CanonicalField:
    Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// 全部字段（声明顺序）
    const ALL: &'static [Self];

    /// 规范字段名（snake_case，用于错误消息与配置键）
    fn name(self) -> &'static str;

    /// 字段值类型（决定字段规范化方式）
    fn value_kind(self) -> FieldKind;

    /// 按规范字段名查找
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

macro_rules! canonical_fields {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($label:literal, $kind:ident)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl CanonicalField for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn value_kind(self) -> FieldKind {
                match self {
                    $($name::$variant => FieldKind::$kind),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

canonical_fields! {
    /// 捐赠人字段
    pub enum DonorField {
        Name => ("name", Text),
        FirstName => ("first_name", Text),
        LastName => ("last_name", Text),
        Email => ("email", Text),
        AltEmail => ("alt_email", Text),
        Phone => ("phone", Text),
        Address => ("address", Text),
        City => ("city", Text),
        State => ("state", Text),
        PostalCode => ("postal_code", Text),
        Country => ("country", Text),
        DonorType => ("donor_type", Text),
        FirstDonationDate => ("first_donation_date", Date),
        LastDonationDate => ("last_donation_date", Date),
        TotalDonated => ("total_donated", Decimal),
        IsRecurring => ("is_recurring", Bool),
        EmailOptIn => ("email_opt_in", Bool),
        Notes => ("notes", Text),
    }
}

canonical_fields! {
    /// 销售订单行字段（每行一个明细，单头字段在同单号各行重复）
    pub enum SalesOrderField {
        OrderNumber => ("order_number", Text),
        OrderDate => ("order_date", Date),
        ShipmentDate => ("shipment_date", Date),
        CustomerName => ("customer_name", Text),
        CustomerCode => ("customer_code", Text),
        CustomerEmail => ("customer_email", Text),
        Status => ("status", Text),
        ItemName => ("item_name", Text),
        Sku => ("sku", Text),
        Quantity => ("quantity", Decimal),
        UnitPrice => ("unit_price", Decimal),
        Amount => ("amount", Decimal),
        Notes => ("notes", Text),
    }
}

canonical_fields! {
    /// 发票行字段
    pub enum InvoiceField {
        InvoiceNumber => ("invoice_number", Text),
        InvoiceDate => ("invoice_date", Date),
        DueDate => ("due_date", Date),
        CustomerName => ("customer_name", Text),
        CustomerCode => ("customer_code", Text),
        CustomerEmail => ("customer_email", Text),
        Status => ("status", Text),
        ItemName => ("item_name", Text),
        Sku => ("sku", Text),
        Quantity => ("quantity", Decimal),
        UnitPrice => ("unit_price", Decimal),
        Amount => ("amount", Decimal),
        IsPaid => ("is_paid", Bool),
        Notes => ("notes", Text),
    }
}

canonical_fields! {
    /// 企业字段
    pub enum CompanyField {
        Name => ("name", Text),
        Email => ("email", Text),
        Phone => ("phone", Text),
        Website => ("website", Text),
        Address => ("address", Text),
        City => ("city", Text),
        State => ("state", Text),
        PostalCode => ("postal_code", Text),
        Country => ("country", Text),
        Industry => ("industry", Text),
        IsActive => ("is_active", Bool),
        Notes => ("notes", Text),
    }
}

canonical_fields! {
    /// 合作伙伴字段
    pub enum PartnerField {
        Name => ("name", Text),
        ContactName => ("contact_name", Text),
        Email => ("email", Text),
        Phone => ("phone", Text),
        Address => ("address", Text),
        City => ("city", Text),
        State => ("state", Text),
        PostalCode => ("postal_code", Text),
        PartnerType => ("partner_type", Text),
        IsActive => ("is_active", Bool),
        Notes => ("notes", Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique_per_kind() {
        fn assert_unique<F: CanonicalField>() {
            let mut names: Vec<_> = F::ALL.iter().map(|f| f.name()).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total);
        }
        assert_unique::<DonorField>();
        assert_unique::<SalesOrderField>();
        assert_unique::<InvoiceField>();
        assert_unique::<CompanyField>();
        assert_unique::<PartnerField>();
    }

    #[test]
    fn test_from_name_and_kind() {
        assert_eq!(DonorField::from_name("alt_email"), Some(DonorField::AltEmail));
        assert_eq!(InvoiceField::DueDate.value_kind(), FieldKind::Date);
        assert_eq!(SalesOrderField::Quantity.value_kind(), FieldKind::Decimal);
        assert_eq!(PartnerField::from_name("nope"), None);
    }
}

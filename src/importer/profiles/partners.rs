// ==========================================
// 非营利运营平台 - 合作伙伴导入 Profile
// ==========================================
// 自然键: 名称 + 邮编（同名不同地址视为不同伙伴）
// 策略: 建或跳过
// ==========================================

use crate::domain::{CanonicalRow, EntityKind, EntityRecord, ImportKind, PartnerField, PartnerRecord};
use crate::importer::profiles::{FlatProfile, ImportProfile};

pub struct PartnerProfile;

impl ImportProfile for PartnerProfile {
    type Field = PartnerField;

    const KIND: ImportKind = ImportKind::Partners;

    fn aliases(field: PartnerField) -> &'static [&'static str] {
        match field {
            PartnerField::Name => &["Partner Name", "Partner", "Organization", "Agency", "Name", "name"],
            PartnerField::ContactName => &["Contact Name", "Contact", "Primary Contact", "contact_name"],
            PartnerField::Email => &["Email", "Contact Email", "Email Address", "email"],
            PartnerField::Phone => &["Phone", "Contact Phone", "Phone Number", "phone"],
            PartnerField::Address => &["Address", "Street", "Address 1", "address"],
            PartnerField::City => &["City", "city"],
            PartnerField::State => &["State", "Province", "state"],
            PartnerField::PostalCode => &["Zip", "ZIP", "Zip Code", "Postal Code", "postal_code"],
            PartnerField::PartnerType => &["Partner Type", "Type", "Agency Type", "partner_type"],
            PartnerField::IsActive => &["Active", "Is Active", "is_active"],
            PartnerField::Notes => &["Notes", "Comments", "notes"],
        }
    }

    fn required() -> &'static [PartnerField] {
        &[PartnerField::Name]
    }

    fn email_fields() -> &'static [PartnerField] {
        &[PartnerField::Email]
    }
}

impl FlatProfile for PartnerProfile {
    const ENTITY: EntityKind = EntityKind::Partner;

    fn to_record(row: &CanonicalRow<PartnerField>) -> EntityRecord {
        EntityRecord::Partner(PartnerRecord {
            name: row.string(PartnerField::Name).unwrap_or_default(),
            contact_name: row.string(PartnerField::ContactName),
            email: row.string(PartnerField::Email),
            phone: row.string(PartnerField::Phone),
            address: row.string(PartnerField::Address),
            city: row.string(PartnerField::City),
            state: row.string(PartnerField::State),
            postal_code: row.string(PartnerField::PostalCode),
            partner_type: row.string(PartnerField::PartnerType),
            is_active: row.flag(PartnerField::IsActive),
            notes: row.string(PartnerField::Notes),
        })
    }
}

// ==========================================
// 非营利运营平台 - 企业导入 Profile
// ==========================================
// 自然键: 名称；策略: 建或跳过
// ==========================================

use crate::domain::{CanonicalRow, CompanyField, CompanyRecord, EntityKind, EntityRecord, ImportKind};
use crate::importer::profiles::{FlatProfile, ImportProfile};

pub struct CompanyProfile;

impl ImportProfile for CompanyProfile {
    type Field = CompanyField;

    const KIND: ImportKind = ImportKind::Companies;

    fn aliases(field: CompanyField) -> &'static [&'static str] {
        match field {
            CompanyField::Name => &["Company Name", "Company", "Name", "Organization", "Business Name", "name"],
            CompanyField::Email => &["Email", "Email Address", "Contact Email", "email"],
            CompanyField::Phone => &["Phone", "Phone Number", "Main Phone", "phone"],
            CompanyField::Website => &["Website", "Web", "URL", "website"],
            CompanyField::Address => &["Address", "Street", "Address 1", "address"],
            CompanyField::City => &["City", "city"],
            CompanyField::State => &["State", "Province", "state"],
            CompanyField::PostalCode => &["Zip", "ZIP", "Zip Code", "Postal Code", "postal_code"],
            CompanyField::Country => &["Country", "country"],
            CompanyField::Industry => &["Industry", "Sector", "industry"],
            CompanyField::IsActive => &["Active", "Is Active", "is_active"],
            CompanyField::Notes => &["Notes", "Comments", "notes"],
        }
    }

    fn required() -> &'static [CompanyField] {
        &[CompanyField::Name]
    }

    fn email_fields() -> &'static [CompanyField] {
        &[CompanyField::Email]
    }
}

impl FlatProfile for CompanyProfile {
    const ENTITY: EntityKind = EntityKind::Company;

    fn to_record(row: &CanonicalRow<CompanyField>) -> EntityRecord {
        EntityRecord::Company(CompanyRecord {
            name: row.string(CompanyField::Name).unwrap_or_default(),
            email: row.string(CompanyField::Email),
            phone: row.string(CompanyField::Phone),
            website: row.string(CompanyField::Website),
            address: row.string(CompanyField::Address),
            city: row.string(CompanyField::City),
            state: row.string(CompanyField::State),
            postal_code: row.string(CompanyField::PostalCode),
            country: row.string(CompanyField::Country),
            industry: row.string(CompanyField::Industry),
            is_active: row.flag(CompanyField::IsActive),
            notes: row.string(CompanyField::Notes),
        })
    }
}

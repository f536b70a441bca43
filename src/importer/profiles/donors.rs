// ==========================================
// 非营利运营平台 - 捐赠人导入 Profile
// ==========================================
// 自然键: 主邮箱（备用邮箱为次级键）
// 策略: 合并（见 donor_merge）
// ==========================================

use crate::domain::{CanonicalRow, DonorField, DonorRecord, FieldValue, ImportKind};
use crate::importer::profiles::ImportProfile;

pub struct DonorProfile;

impl DonorProfile {
    /// 规范行 → 捐赠人记录
    pub fn donor(row: &CanonicalRow<DonorField>) -> DonorRecord {
        DonorRecord {
            name: row.string(DonorField::Name).unwrap_or_default(),
            email: row.string(DonorField::Email).unwrap_or_default(),
            alt_email: row.string(DonorField::AltEmail),
            phone: row.string(DonorField::Phone),
            address: row.string(DonorField::Address),
            city: row.string(DonorField::City),
            state: row.string(DonorField::State),
            postal_code: row.string(DonorField::PostalCode),
            country: row.string(DonorField::Country),
            donor_type: row.string(DonorField::DonorType),
            first_donation_date: row.date(DonorField::FirstDonationDate),
            last_donation_date: row.date(DonorField::LastDonationDate),
            total_donated: row.decimal(DonorField::TotalDonated),
            is_recurring: row.flag(DonorField::IsRecurring),
            email_opt_in: row.flag(DonorField::EmailOptIn),
            notes: row.string(DonorField::Notes),
        }
    }
}

impl ImportProfile for DonorProfile {
    type Field = DonorField;

    const KIND: ImportKind = ImportKind::Donors;

    fn aliases(field: DonorField) -> &'static [&'static str] {
        match field {
            DonorField::Name => &["Name", "Full Name", "Donor Name", "Donor", "Constituent Name", "name"],
            DonorField::FirstName => &["First Name", "FirstName", "First", "first_name"],
            DonorField::LastName => &["Last Name", "LastName", "Last", "Surname", "last_name"],
            DonorField::Email => &["Email", "Email Address", "E-mail", "Primary Email", "email"],
            DonorField::AltEmail => &["Alternate Email", "Alt Email", "Secondary Email", "Email 2", "alt_email"],
            DonorField::Phone => &["Phone", "Phone Number", "Mobile", "Home Phone", "phone"],
            DonorField::Address => &["Address", "Street", "Address 1", "Address Line 1", "address"],
            DonorField::City => &["City", "Town", "city"],
            DonorField::State => &["State", "Province", "Region", "state"],
            DonorField::PostalCode => &["Zip", "ZIP", "Zip Code", "Postal Code", "Postcode", "postal_code"],
            DonorField::Country => &["Country", "country"],
            DonorField::DonorType => &["Donor Type", "Type", "Constituent Type", "donor_type"],
            DonorField::FirstDonationDate => &["First Donation Date", "First Gift Date", "First Gift", "first_donation_date"],
            DonorField::LastDonationDate => &["Last Donation Date", "Last Gift Date", "Last Gift", "last_donation_date"],
            DonorField::TotalDonated => &["Total Donated", "Lifetime Giving", "Total Giving", "Total Gifts", "total_donated"],
            DonorField::IsRecurring => &["Recurring", "Is Recurring", "Recurring Donor", "is_recurring"],
            DonorField::EmailOptIn => &["Email Opt In", "Opt In", "Newsletter", "email_opt_in"],
            DonorField::Notes => &["Notes", "Comments", "Note", "notes"],
        }
    }

    fn required() -> &'static [DonorField] {
        &[DonorField::Name, DonorField::Email]
    }

    fn email_fields() -> &'static [DonorField] {
        &[DonorField::Email, DonorField::AltEmail]
    }

    /// 无全名列时由 名 + 姓 拼出
    fn derive(row: &mut CanonicalRow<DonorField>) {
        if row.is_present(DonorField::Name) {
            return;
        }
        let parts: Vec<&str> = [DonorField::FirstName, DonorField::LastName]
            .into_iter()
            .filter_map(|f| row.text(f))
            .collect();
        if !parts.is_empty() {
            let name = parts.join(" ");
            row.set(DonorField::Name, FieldValue::Text(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_derived_from_first_and_last() {
        let mut row = CanonicalRow::new(2);
        row.set(DonorField::FirstName, FieldValue::Text("Ada".to_string()));
        row.set(DonorField::LastName, FieldValue::Text("Lovelace".to_string()));
        DonorProfile::derive(&mut row);
        assert_eq!(row.text(DonorField::Name), Some("Ada Lovelace"));
    }

    #[test]
    fn test_existing_name_not_overwritten() {
        let mut row = CanonicalRow::new(2);
        row.set(DonorField::Name, FieldValue::Text("A. Lovelace".to_string()));
        row.set(DonorField::FirstName, FieldValue::Text("Ada".to_string()));
        DonorProfile::derive(&mut row);
        assert_eq!(row.text(DonorField::Name), Some("A. Lovelace"));
    }
}

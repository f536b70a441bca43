// ==========================================
// 非营利运营平台 - 行校验器
// ==========================================
// 阶段 3: 必填 / 格式校验
// 规则:
// - 必填字段按声明顺序检查，首个缺失即报错
// - 之后对有值的邮箱字段做格式检查
// - 每行最多一条错误；失败行不进入后续阶段
// ==========================================

use crate::domain::{CanonicalField, CanonicalRow, RowError};
use crate::i18n::t_with_args;
use crate::importer::profiles::ImportProfile;
use regex::Regex;
use std::marker::PhantomData;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// 邮箱形如 local@domain.tld
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}

pub struct RowValidator<P: ImportProfile> {
    _profile: PhantomData<P>,
}

impl<P: ImportProfile> RowValidator<P> {
    pub fn validate(row: &CanonicalRow<P::Field>) -> Result<(), RowError> {
        if let Some(missing) = P::required().iter().find(|&&f| !row.is_present(f)) {
            return Err(RowError::at_row(
                row.row_number,
                t_with_args("import.missing_field", &[("field", missing.name())]),
            ));
        }

        for &field in P::email_fields() {
            if let Some(value) = row.text(field) {
                if !is_valid_email(value) {
                    return Err(RowError::at_row(
                        row.row_number,
                        t_with_args(
                            "import.invalid_email",
                            &[("field", field.name()), ("value", value)],
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DonorField, FieldValue};
    use crate::importer::profiles::DonorProfile;

    fn donor_row(name: Option<&str>, email: Option<&str>, alt: Option<&str>) -> CanonicalRow<DonorField> {
        let mut row = CanonicalRow::new(7);
        if let Some(v) = name {
            row.set(DonorField::Name, FieldValue::Text(v.to_string()));
        }
        if let Some(v) = email {
            row.set(DonorField::Email, FieldValue::Text(v.to_string()));
        }
        if let Some(v) = alt {
            row.set(DonorField::AltEmail, FieldValue::Text(v.to_string()));
        }
        row
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ada@example.org"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.org"));
        assert!(!is_valid_email("@x.org"));
    }

    #[test]
    fn test_first_missing_required_field_reported() {
        let err = RowValidator::<DonorProfile>::validate(&donor_row(None, None, None)).unwrap_err();
        assert_eq!(err.row_number, 7);
        assert!(err.message.contains("name"));
        assert!(!err.message.contains("email"));
    }

    #[test]
    fn test_optional_email_checked_only_when_present() {
        assert!(RowValidator::<DonorProfile>::validate(&donor_row(Some("Ada"), Some("ada@x.org"), None)).is_ok());

        let err = RowValidator::<DonorProfile>::validate(&donor_row(
            Some("Ada"),
            Some("ada@x.org"),
            Some("not-an-email"),
        ))
        .unwrap_err();
        assert!(err.message.contains("alt_email"));
    }
}

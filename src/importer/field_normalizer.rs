// ==========================================
// 非营利运营平台 - 字段规范化
// ==========================================
// 阶段 2: 单元格文本 → 类型化值
// 规则: 全部为全函数（不报错）；空值 → 缺失
// ==========================================

use crate::domain::{CanonicalField, CanonicalRow, DraftRow, FieldKind, FieldValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 主日期格式（按顺序尝试）
/// - `13 Oct 2025` / `13 October 2025`（%b 解析时兼容全称，大小写不敏感）
/// - `2025-10-13`
/// - `10/13/2025`
const PRIMARY_DATE_FORMATS: &[&str] = &["%d %b %Y", "%Y-%m-%d", "%m/%d/%Y"];

/// 兜底日期格式（常见导出形态）
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%b %d, %Y", "%d-%b-%Y", "%Y%m%d"];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

pub struct FieldNormalizer;

impl FieldNormalizer {
    /// 草稿行 → 规范行（按字段值类型转换）
    pub fn normalize<F: CanonicalField>(draft: &DraftRow<F>) -> CanonicalRow<F> {
        let mut row = CanonicalRow::new(draft.row_number);
        for (&field, raw) in &draft.cells {
            if let Some(value) = Self::normalize_value(field.value_kind(), raw) {
                row.set(field, value);
            }
        }
        row
    }

    pub fn normalize_value(kind: FieldKind, raw: &str) -> Option<FieldValue> {
        match kind {
            FieldKind::Text => Self::clean_text(raw).map(FieldValue::Text),
            FieldKind::Decimal => Self::parse_decimal(raw).map(FieldValue::Decimal),
            FieldKind::Date => Self::parse_date(raw).map(FieldValue::Date),
            FieldKind::Bool => Self::parse_bool(raw).map(FieldValue::Bool),
        }
    }

    /// 去首尾空白；空 → None
    pub fn clean_text(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// 日期解析；无法识别 → None（“无日期”）
    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }

        PRIMARY_DATE_FORMATS
            .iter()
            .chain(FALLBACK_DATE_FORMATS)
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
            .or_else(|| {
                FALLBACK_DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                    .map(|dt| dt.date())
            })
    }

    /// 金额/数量解析
    ///
    /// - 去掉数字、`.`、`-` 以外的字符（货币符号、千分位）
    /// - `(100.00)` 记为 -100.00
    /// - 非空但无法解析 → 0
    pub fn parse_decimal(raw: &str) -> Option<Decimal> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }

        let (negative, body) = match value.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            Some(inner) => (true, inner),
            None => (false, value),
        };

        let cleaned: String = body
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();

        let parsed = Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO);
        Some(if negative { -parsed } else { parsed })
    }

    /// 布尔解析: yes/true/1（大小写不敏感）为真，其余为假
    pub fn parse_bool(raw: &str) -> Option<bool> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        Some(matches!(
            value.to_ascii_lowercase().as_str(),
            "yes" | "true" | "1"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DonorField;
    use std::collections::BTreeMap;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_primary_date_formats() {
        assert_eq!(FieldNormalizer::parse_date("13 Oct 2025"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("2025-10-13"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("10/13/2025"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date(""), None);
    }

    #[test]
    fn test_month_name_variants() {
        assert_eq!(FieldNormalizer::parse_date("3 october 2025"), ymd(2025, 10, 3));
        assert_eq!(FieldNormalizer::parse_date("13 OCT 2025"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("1/5/2025"), ymd(2025, 1, 5));
    }

    #[test]
    fn test_fallback_date_formats() {
        assert_eq!(FieldNormalizer::parse_date("2025/10/13"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("Oct 13, 2025"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("2025-10-13T08:30:00Z"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("2025-10-13 08:30:00"), ymd(2025, 10, 13));
        assert_eq!(FieldNormalizer::parse_date("next tuesday"), None);
    }

    #[test]
    fn test_decimal_strips_symbols() {
        assert_eq!(FieldNormalizer::parse_decimal("$1,250.50"), Decimal::from_str("1250.50").ok());
        assert_eq!(FieldNormalizer::parse_decimal("(100.00)"), Decimal::from_str("-100.00").ok());
        assert_eq!(FieldNormalizer::parse_decimal("-3"), Some(Decimal::from(-3)));
        assert_eq!(FieldNormalizer::parse_decimal("n/a"), Some(Decimal::ZERO));
        assert_eq!(FieldNormalizer::parse_decimal("  "), None);
    }

    #[test]
    fn test_bool_values() {
        assert_eq!(FieldNormalizer::parse_bool("Yes"), Some(true));
        assert_eq!(FieldNormalizer::parse_bool("TRUE"), Some(true));
        assert_eq!(FieldNormalizer::parse_bool("1"), Some(true));
        assert_eq!(FieldNormalizer::parse_bool("no"), Some(false));
        assert_eq!(FieldNormalizer::parse_bool("y"), Some(false));
        assert_eq!(FieldNormalizer::parse_bool(""), None);
    }

    #[test]
    fn test_normalize_row_by_field_kind() {
        let mut cells = BTreeMap::new();
        cells.insert(DonorField::Name, "  Ada  ".to_string());
        cells.insert(DonorField::TotalDonated, "$10".to_string());
        cells.insert(DonorField::IsRecurring, "yes".to_string());
        cells.insert(DonorField::FirstDonationDate, "garbage".to_string());
        let row = FieldNormalizer::normalize(&DraftRow { row_number: 5, cells });

        assert_eq!(row.row_number, 5);
        assert_eq!(row.text(DonorField::Name), Some("Ada"));
        assert_eq!(row.decimal(DonorField::TotalDonated), Some(Decimal::from(10)));
        assert_eq!(row.flag(DonorField::IsRecurring), Some(true));
        assert!(row.get(DonorField::FirstDonationDate).is_none());
    }
}

// ==========================================
// 非营利运营平台 - 行模型
// ==========================================
// 导入管道中间产物:
//   RawRow (分词器) → DraftRow (列解析) → CanonicalRow (字段规范化)
// 生命周期: 仅在单次导入流程内
// ==========================================

use crate::domain::fields::CanonicalField;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

// ==========================================
// RawRow - 原始行（表头标签 → 原始单元格）
// ==========================================
// 红线: 生成后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    row_number: usize,
    headers: Arc<[String]>,
    cells: Vec<String>,
}

impl RawRow {
    pub fn new(row_number: usize, headers: Arc<[String]>, cells: Vec<String>) -> Self {
        Self {
            row_number,
            headers,
            cells,
        }
    }

    /// 行号（1 起，计入表头：首个数据行为 2）
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 按列序号取值；短行缺失的单元格视为空
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    /// 按表头标签取值（同名列取第一列）
    pub fn get(&self, label: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == label)
            .map(|idx| self.cell(idx))
    }

    /// 按表头顺序遍历 (标签, 值)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .enumerate()
            .map(move |(idx, h)| (h.as_str(), self.cell(idx)))
    }
}

// ==========================================
// DraftRow - 列解析后的未校验行（规范字段 → 原始文本）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRow<F: CanonicalField> {
    pub row_number: usize,
    pub cells: BTreeMap<F, String>,
}

// ==========================================
// FieldValue - 规范化后的字段值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    Bool(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 空白文本视为“未填”
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

// ==========================================
// CanonicalRow - 规范行（规范字段 → 类型化值）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow<F: CanonicalField> {
    pub row_number: usize,
    values: BTreeMap<F, FieldValue>,
}

impl<F: CanonicalField> CanonicalRow<F> {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field: F, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: F) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// 字段存在且非空白
    pub fn is_present(&self, field: F) -> bool {
        self.values.get(&field).is_some_and(|v| !v.is_blank())
    }

    pub fn text(&self, field: F) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    /// 文本字段的拥有型副本（构建记录时使用）
    pub fn string(&self, field: F) -> Option<String> {
        self.text(field).map(str::to_string)
    }

    pub fn decimal(&self, field: F) -> Option<Decimal> {
        self.get(field).and_then(FieldValue::as_decimal)
    }

    pub fn date(&self, field: F) -> Option<NaiveDate> {
        self.get(field).and_then(FieldValue::as_date)
    }

    pub fn flag(&self, field: F) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&F, &FieldValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fields::DonorField;

    #[test]
    fn test_raw_row_lookup_and_short_rows() {
        let headers: Arc<[String]> = vec!["Name".to_string(), "Email".to_string(), "Phone".to_string()].into();
        let row = RawRow::new(2, headers, vec!["Ada".to_string(), "ada@example.org".to_string()]);

        assert_eq!(row.get("Email"), Some("ada@example.org"));
        assert_eq!(row.get("Phone"), Some(""));
        assert_eq!(row.get("Fax"), None);
        assert_eq!(row.iter().count(), 3);
    }

    #[test]
    fn test_canonical_row_blank_text_is_not_present() {
        let mut row = CanonicalRow::new(3);
        row.set(DonorField::Name, FieldValue::Text("   ".to_string()));
        row.set(DonorField::IsRecurring, FieldValue::Bool(false));

        assert!(!row.is_present(DonorField::Name));
        assert_eq!(row.text(DonorField::Name), None);
        assert!(row.is_present(DonorField::IsRecurring));
        assert_eq!(row.flag(DonorField::IsRecurring), Some(false));
    }
}

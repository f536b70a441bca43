// ==========================================
// 非营利运营平台 - 列解析器
// ==========================================
// 阶段 1: 表头 + 别名表 → 规范字段
// 规则:
// - 每个字段按候选列名优先级绑定文件中存在的列（精确匹配，大小写敏感）
// - 逐行取第一个非空的已绑定列
// - 未绑定字段对所有行缺失；全部必填字段都未绑定 → 致命错误
// ==========================================

use crate::domain::{CanonicalField, DraftRow, RawRow};
use crate::importer::error::ImportError;
use crate::importer::profiles::ImportProfile;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

// ==========================================
// AliasTable - 字段 → 候选列名（优先级从高到低）
// ==========================================
#[derive(Debug, Clone)]
pub struct AliasTable<F: CanonicalField> {
    candidates: BTreeMap<F, Vec<String>>,
}

impl<F: CanonicalField> AliasTable<F> {
    /// 内置别名表
    pub fn builtin<P: ImportProfile<Field = F>>() -> Self {
        Self::with_overrides::<P>(&HashMap::new())
    }

    /// 部署配置的别名排在内置别名之前
    ///
    /// # 参数
    /// - overrides: 规范字段名 → 附加候选列名
    pub fn with_overrides<P: ImportProfile<Field = F>>(
        overrides: &HashMap<String, Vec<String>>,
    ) -> Self {
        for name in overrides.keys() {
            if F::from_name(name).is_none() {
                warn!(kind = %P::KIND, field = %name, "别名配置引用了未知字段，已忽略");
            }
        }

        let candidates = F::ALL
            .iter()
            .map(|&field| {
                let mut list: Vec<String> = Vec::new();
                let configured = overrides.get(field.name()).into_iter().flatten();
                let builtin = P::aliases(field).iter().map(|s| s.to_string());
                for alias in configured.cloned().chain(builtin) {
                    let alias = alias.trim().to_string();
                    if !alias.is_empty() && !list.contains(&alias) {
                        list.push(alias);
                    }
                }
                (field, list)
            })
            .collect();

        Self { candidates }
    }

    pub fn candidates(&self, field: F) -> &[String] {
        self.candidates.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ==========================================
// ColumnResolver - 绑定后的列映射（单个文件）
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnResolver<F: CanonicalField> {
    /// 字段 → 列序号（按别名优先级）
    bindings: BTreeMap<F, Vec<usize>>,
}

impl<F: CanonicalField> ColumnResolver<F> {
    /// 按表头绑定列
    ///
    /// # 返回
    /// - Err(MissingRequiredColumns): 所有必填字段都没有对应列
    pub fn bind(
        table: &AliasTable<F>,
        headers: &[String],
        required: &[F],
    ) -> Result<Self, ImportError> {
        let mut bindings = BTreeMap::new();
        for &field in F::ALL {
            let indices: Vec<usize> = table
                .candidates(field)
                .iter()
                .flat_map(|alias| {
                    headers
                        .iter()
                        .enumerate()
                        .filter(move |(_, h)| *h == alias)
                        .map(|(idx, _)| idx)
                })
                .collect();
            if !indices.is_empty() {
                bindings.insert(field, indices);
            }
        }

        if !required.is_empty() && required.iter().all(|f| !bindings.contains_key(f)) {
            return Err(ImportError::MissingRequiredColumns {
                columns: required.iter().map(|f| f.name().to_string()).collect(),
            });
        }

        debug!(
            bound = bindings.len(),
            unbound = F::ALL.len() - bindings.len(),
            "列绑定完成"
        );
        Ok(Self { bindings })
    }

    pub fn is_bound(&self, field: F) -> bool {
        self.bindings.contains_key(&field)
    }

    /// 原始行 → 草稿行（逐字段取第一个非空候选列）
    pub fn resolve(&self, raw: &RawRow) -> DraftRow<F> {
        let cells = self
            .bindings
            .iter()
            .filter_map(|(&field, indices)| {
                indices
                    .iter()
                    .map(|&idx| raw.cell(idx))
                    .find(|cell| !cell.trim().is_empty())
                    .map(|cell| (field, cell.to_string()))
            })
            .collect();

        DraftRow {
            row_number: raw.row_number(),
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DonorField;
    use crate::importer::profiles::DonorProfile;
    use std::sync::Arc;

    fn raw(headers: &[&str], cells: &[&str]) -> RawRow {
        let headers: Arc<[String]> = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>().into();
        RawRow::new(2, headers, cells.iter().map(|c| c.to_string()).collect())
    }

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_first_non_empty_candidate_wins() {
        let table = AliasTable::builtin::<DonorProfile>();
        let hdrs = headers(&["Email", "Email Address", "Name"]);
        let resolver = ColumnResolver::bind(&table, &hdrs, &[DonorField::Name]).unwrap();

        let row = resolver.resolve(&raw(&["Email", "Email Address", "Name"], &["", "b@x.org", "Bo"]));
        assert_eq!(row.cells.get(&DonorField::Email).map(String::as_str), Some("b@x.org"));

        let row = resolver.resolve(&raw(&["Email", "Email Address", "Name"], &["a@x.org", "b@x.org", "Al"]));
        assert_eq!(row.cells.get(&DonorField::Email).map(String::as_str), Some("a@x.org"));
    }

    #[test]
    fn test_header_match_is_case_sensitive() {
        let table = AliasTable::builtin::<DonorProfile>();
        let resolver =
            ColumnResolver::bind(&table, &headers(&["EMAIL", "Name"]), &[DonorField::Name]).unwrap();
        assert!(!resolver.is_bound(DonorField::Email));
    }

    #[test]
    fn test_configured_alias_takes_priority() {
        let mut overrides = HashMap::new();
        overrides.insert("email".to_string(), vec!["Correo".to_string()]);
        let table = AliasTable::with_overrides::<DonorProfile>(&overrides);
        assert_eq!(table.candidates(DonorField::Email)[0], "Correo");

        let hdrs = headers(&["Email", "Correo"]);
        let resolver = ColumnResolver::bind(&table, &hdrs, &[DonorField::Email]).unwrap();
        let row = resolver.resolve(&raw(&["Email", "Correo"], &["a@x.org", "c@x.org"]));
        assert_eq!(row.cells.get(&DonorField::Email).map(String::as_str), Some("c@x.org"));
    }

    #[test]
    fn test_no_required_column_is_fatal() {
        let table = AliasTable::builtin::<DonorProfile>();
        let err = ColumnResolver::bind(
            &table,
            &headers(&["Phone", "City"]),
            &[DonorField::Name, DonorField::Email],
        )
        .unwrap_err();
        match err {
            ImportError::MissingRequiredColumns { columns } => {
                assert_eq!(columns, vec!["name", "email"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_one_required_column_is_enough_to_bind() {
        let table = AliasTable::builtin::<DonorProfile>();
        assert!(ColumnResolver::bind(
            &table,
            &headers(&["Email"]),
            &[DonorField::Name, DonorField::Email],
        )
        .is_ok());
    }
}

// ==========================================
// 非营利运营平台 - 单据分组
// ==========================================
// 明细行 → 按单据号分组（首次出现顺序）；组内保持源文件顺序
// ==========================================

use crate::domain::DocumentGroup;
use std::collections::HashMap;

pub struct Grouper;

impl Grouper {
    /// 按单据号分组
    ///
    /// # 参数
    /// - items: (单据号, 明细) 序列，按源文件顺序
    ///
    /// # 返回
    /// - 分组列表，顺序为单据号首次出现的顺序
    pub fn group_by_document<T>(
        items: impl IntoIterator<Item = (String, T)>,
    ) -> Vec<DocumentGroup<T>> {
        let mut groups: Vec<DocumentGroup<T>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (document_number, item) in items {
            let slot = match index.get(&document_number) {
                Some(&slot) => slot,
                None => {
                    index.insert(document_number.clone(), groups.len());
                    groups.push(DocumentGroup::new(document_number));
                    groups.len() - 1
                }
            };
            groups[slot].items.push(item);
        }

        groups
    }
}

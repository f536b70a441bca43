// ==========================================
// 非营利运营平台 - 导入结果模型
// ==========================================
// 红线: ImportResult 是返回给调用方的唯一值，UI 依赖其字段契约
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RowError - 行级错误
// ==========================================
// 用途: 任何非致命错误都转换为 RowError 累积，绝不中断导入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// 行号（1 起，计入表头）；0 表示文件级错误
    pub row_number: usize,
    pub message: String,
    /// 分组导入时的单据号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl RowError {
    pub fn at_row(row_number: usize, message: impl Into<String>) -> Self {
        Self {
            row_number,
            message: message.into(),
            document_id: None,
        }
    }

    pub fn for_document(
        document_id: impl Into<String>,
        row_number: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_number,
            message: message.into(),
            document_id: Some(document_id.into()),
        }
    }

    pub fn file_level(message: impl Into<String>) -> Self {
        Self::at_row(0, message)
    }
}

/// 错误日志行格式: `Row <n>: <message>` 或 `<DocumentId>: <message>`
impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.document_id, self.row_number) {
            (Some(doc), _) => write!(f, "{}: {}", doc, self.message),
            (None, 0) => f.write_str(&self.message),
            (None, row) => write!(f, "Row {}: {}", row, self.message),
        }
    }
}

// ==========================================
// ImportResult - 导入汇总结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success_count: usize,
    pub failure_count: usize,
    /// 与已有记录（或同文件先前行）匹配的行数；是成功数的注解，不单独计入总数
    pub duplicate_count: usize,
    pub errors: Vec<RowError>,
}

impl ImportResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 致命错误结果: 成功数为 0，仅一条顶层错误
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            errors: vec![RowError::file_level(message)],
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, count: usize) {
        self.success_count += count;
    }

    pub fn record_duplicates(&mut self, count: usize) {
        self.duplicate_count += count;
    }

    /// 记录一个失败单元（计入失败数）
    pub fn record_failure(&mut self, error: RowError) {
        self.failure_count += 1;
        self.errors.push(error);
    }

    /// 记录明细级错误（单头已成功，不计入失败数）
    pub fn record_item_error(&mut self, error: RowError) {
        self.errors.push(error);
    }

    /// 已结算的单元数
    pub fn processed(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 导出错误日志（每行一条）
    pub fn error_log(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}\n", e))
            .collect()
    }
}

// ==========================================
// DocumentGroup - 单据分组
// ==========================================
// 红线: items 保持源文件出现顺序，不去重不重排
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGroup<T> {
    pub document_number: String,
    pub items: Vec<T>,
}

impl<T> DocumentGroup<T> {
    pub fn new(document_number: impl Into<String>) -> Self {
        Self {
            document_number: document_number.into(),
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

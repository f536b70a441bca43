// ==========================================
// 非营利运营平台 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 范围: 仅致命错误（写入前中止）；行级错误一律走 RowError
// ==========================================

use crate::i18n::{t, t_with_args};
use thiserror::Error;

/// 导入模块致命错误
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不含任何非空行")]
    EmptyFile,

    #[error("文件读取失败 ({path}): {message}")]
    FileRead { path: String, message: String },

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 列解析错误 =====
    #[error("表头缺少全部必需列: {}", .columns.join(", "))]
    MissingRequiredColumns { columns: Vec<String> },
}

impl ImportError {
    /// 面向导入操作员的本地化消息（写入 ImportResult 顶层错误）
    pub fn user_message(&self) -> String {
        match self {
            ImportError::EmptyFile => t("import.empty_file"),
            ImportError::MissingRequiredColumns { columns } => {
                t_with_args("import.missing_columns", &[("columns", &columns.join(", "))])
            }
            ImportError::FileRead { path, message } => {
                t_with_args("import.file_read", &[("path", path), ("error", message)])
            }
            other => other.to_string(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileRead {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

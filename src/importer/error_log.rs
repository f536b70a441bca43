// ==========================================
// 非营利运营平台 - 错误日志导出
// ==========================================
// 格式: 每行一条，`Row <n>: <message>` 或 `<DocumentId>: <message>`
// ==========================================

use crate::domain::ImportResult;
use std::path::Path;
use tracing::info;

/// 把导入错误写入文本文件（无错误时写空文件）
pub async fn write_error_log(result: &ImportResult, path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, result.error_log()).await?;
    info!(path = %path.display(), errors = result.errors.len(), "错误日志已导出");
    Ok(())
}

// ==========================================
// 非营利运营平台 - 记录导入 Trait
// ==========================================
// 职责: 定义导入入口接口
// 红线:
// - 行级问题只累积到 ImportResult，不中断导入
// - 只有文件级问题（空文件 / 表头无必填列 / 读取失败）返回 Err
// ==========================================

use crate::domain::{ImportKind, ImportResult};
use crate::importer::error::ImportError;
use crate::importer::progress::ProgressSink;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// RecordImporter Trait
// ==========================================
#[async_trait]
pub trait RecordImporter: Send + Sync {
    /// 从 CSV 文本导入
    ///
    /// # 参数
    /// - kind: 导入类型（决定 Profile 与对账策略）
    /// - text: 完整 CSV 文本（首行为表头，可带 BOM）
    /// - progress: 进度回调，写入阶段每处理一个单元回调一次
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入完成（可能含行级错误）
    /// - Err(ImportError): 文件级致命错误，未写入任何记录
    ///
    /// # 流程
    /// 1. 分词 → 列绑定 → 规范化 → 校验
    /// 2. 批量查询已有实体，缺失的关联实体一次性新建
    /// 3. 分组（单据类）
    /// 4. 分批写入，汇总计数
    async fn import_from_csv(
        &self,
        kind: ImportKind,
        text: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError>;

    /// 从文件导入（非 UTF-8 字节按替换字符处理）
    ///
    /// # 参数
    /// - kind: 导入类型
    /// - file_path: CSV 文件路径
    /// - progress: 进度回调
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        kind: ImportKind,
        file_path: P,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError>;

    /// 批量导入多个文件（并发执行，进度写入日志）
    ///
    /// # 参数
    /// - kind: 导入类型（所有文件相同）
    /// - file_paths: 文件路径列表
    ///
    /// # 返回
    /// - 与输入顺序一致的结果列表
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        kind: ImportKind,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportResult, ImportError>>;
}

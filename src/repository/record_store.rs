// ==========================================
// 非营利运营平台 - 记录库协作接口
// ==========================================
// 职责: 导入引擎对外部记录库的全部依赖（不包含实现）
// 红线: 记录库不提供跨调用事务；每次调用独立成败
// ==========================================

use crate::domain::{DocumentHeader, EntityKey, EntityKind, EntityRecord, LineItem, StoredEntity};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::sync::Arc;

// ==========================================
// RecordStore Trait
// ==========================================
// 实现者: SqliteRecordStore（rusqlite）, InMemoryRecordStore（试运行/测试）
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ===== (a) 按自然键批量查找实体 =====

    /// 批量查找已有实体
    ///
    /// # 参数
    /// - kind: 实体种类
    /// - keys: 自然键集合（已规范化）
    ///
    /// # 返回
    /// - 任一自然键（主键或次级键）命中的实体列表
    async fn find_entities(
        &self,
        kind: EntityKind,
        keys: &[EntityKey],
    ) -> RepositoryResult<Vec<StoredEntity>>;

    // ===== (b) 批量新建实体 =====

    /// 单次调用批量新建实体，返回带存储 ID 的实体（顺序与入参一致）
    ///
    /// # 说明
    /// - 整体成功或整体失败
    async fn insert_entities(
        &self,
        entities: Vec<EntityRecord>,
    ) -> RepositoryResult<Vec<StoredEntity>>;

    // ===== (c) 批量写入独立记录 =====

    /// 批量写入一组互相独立的记录
    ///
    /// # 返回
    /// - Ok(usize): 写入条数
    /// - Err: 本批整体失败（不影响之前已提交的批次）
    async fn insert_records(&self, records: Vec<EntityRecord>) -> RepositoryResult<usize>;

    /// 原地更新一条已有记录（捐赠人合并策略使用）
    async fn update_record(&self, id: &str, record: EntityRecord) -> RepositoryResult<()>;

    // ===== (d) 单头 + 明细顺序写入 =====

    /// 新建单据单头，返回单头存储 ID
    async fn insert_document(&self, header: DocumentHeader) -> RepositoryResult<String>;

    /// 单次调用写入某单头下的全部明细
    async fn insert_document_lines(
        &self,
        document_id: &str,
        lines: Vec<LineItem>,
    ) -> RepositoryResult<usize>;
}

// 共享句柄（CLI 在导入结束后仍需访问记录库）
#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn find_entities(
        &self,
        kind: EntityKind,
        keys: &[EntityKey],
    ) -> RepositoryResult<Vec<StoredEntity>> {
        (**self).find_entities(kind, keys).await
    }

    async fn insert_entities(
        &self,
        entities: Vec<EntityRecord>,
    ) -> RepositoryResult<Vec<StoredEntity>> {
        (**self).insert_entities(entities).await
    }

    async fn insert_records(&self, records: Vec<EntityRecord>) -> RepositoryResult<usize> {
        (**self).insert_records(records).await
    }

    async fn update_record(&self, id: &str, record: EntityRecord) -> RepositoryResult<()> {
        (**self).update_record(id, record).await
    }

    async fn insert_document(&self, header: DocumentHeader) -> RepositoryResult<String> {
        (**self).insert_document(header).await
    }

    async fn insert_document_lines(
        &self,
        document_id: &str,
        lines: Vec<LineItem>,
    ) -> RepositoryResult<usize> {
        (**self).insert_document_lines(document_id, lines).await
    }
}

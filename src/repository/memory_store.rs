// ==========================================
// 非营利运营平台 - 内存记录库
// ==========================================
// 用途: 试运行（--dry-run）与测试
// 能力: 与 SqliteRecordStore 相同的唯一性/外键约束 + 故障注入
// ==========================================

use crate::domain::{DocumentHeader, EntityKey, EntityKind, EntityRecord, LineItem, StoredEntity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::RecordStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// 已写入的单据（单头 + 明细）
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub header: DocumentHeader,
    pub lines: Vec<LineItem>,
}

// 故障注入计划
#[derive(Debug, Default)]
struct FaultPlan {
    /// 第 N 次 insert_records 调用失败（1 起）
    record_insert_calls: HashSet<usize>,
    entity_inserts: bool,
    lookups: bool,
    /// 按单据号失败的单头
    documents: HashSet<String>,
    /// 按单据号失败的明细写入
    lines_of: HashSet<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    entities: Vec<StoredEntity>,
    documents: Vec<StoredDocument>,
    record_insert_calls: usize,
    entity_insert_calls: usize,
    lookup_calls: usize,
    update_calls: usize,
    faults: FaultPlan,
}

impl MemoryState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    fn has_primary_key(&self, record: &EntityRecord) -> bool {
        let kind = record.kind();
        let key = record.primary_key();
        self.entities
            .iter()
            .any(|e| e.record.kind() == kind && e.record.primary_key() == key)
    }

    /// 批量写入前的唯一性检查（含批内重复）；整体成功或整体失败
    fn check_unique(&self, records: &[EntityRecord]) -> RepositoryResult<()> {
        let mut seen: HashSet<(EntityKind, EntityKey)> = HashSet::new();
        for record in records {
            let pair = (record.kind(), record.primary_key());
            if self.has_primary_key(record) || !seen.insert(pair) {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "{} '{}' already exists",
                    record.kind(),
                    record.primary_key()
                )));
            }
        }
        Ok(())
    }

    fn push_entities(&mut self, records: Vec<EntityRecord>) -> Vec<StoredEntity> {
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let entity = StoredEntity {
                id: self.allocate_id(),
                record,
            };
            self.entities.push(entity.clone());
            stored.push(entity);
        }
        stored
    }
}

// ==========================================
// InMemoryRecordStore
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== 故障注入（构建器风格） =====

    /// 第 `call`（1 起）次 insert_records 调用失败
    pub fn fail_record_insert_call(self, call: usize) -> Self {
        self.with_state(|s| {
            s.faults.record_insert_calls.insert(call);
        });
        self
    }

    pub fn fail_entity_inserts(self) -> Self {
        self.with_state(|s| s.faults.entity_inserts = true);
        self
    }

    pub fn fail_lookups(self) -> Self {
        self.with_state(|s| s.faults.lookups = true);
        self
    }

    /// 指定单据号的单头写入失败
    pub fn fail_document(self, document_number: &str) -> Self {
        self.with_state(|s| {
            s.faults.documents.insert(document_number.to_string());
        });
        self
    }

    /// 指定单据号的明细写入失败（单头成功）
    pub fn fail_lines_of(self, document_number: &str) -> Self {
        self.with_state(|s| {
            s.faults.lines_of.insert(document_number.to_string());
        });
        self
    }

    // ===== 预置数据与观测 =====

    /// 直接写入一条已有实体（模拟上一轮导入的结果）
    pub fn seed(&self, record: EntityRecord) -> String {
        self.with_state(|s| {
            let id = s.allocate_id();
            s.entities.push(StoredEntity {
                id: id.clone(),
                record,
            });
            id
        })
    }

    pub fn entities(&self, kind: EntityKind) -> Vec<StoredEntity> {
        self.with_state(|s| {
            s.entities
                .iter()
                .filter(|e| e.record.kind() == kind)
                .cloned()
                .collect()
        })
    }

    pub fn documents(&self) -> Vec<StoredDocument> {
        self.with_state(|s| s.documents.clone())
    }

    pub fn lookup_calls(&self) -> usize {
        self.with_state(|s| s.lookup_calls)
    }

    pub fn record_insert_calls(&self) -> usize {
        self.with_state(|s| s.record_insert_calls)
    }

    pub fn entity_insert_calls(&self) -> usize {
        self.with_state(|s| s.entity_insert_calls)
    }

    pub fn update_calls(&self) -> usize {
        self.with_state(|s| s.update_calls)
    }

    // 观测/构建接口在锁中毒时仍可读取
    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_entities(
        &self,
        kind: EntityKind,
        keys: &[EntityKey],
    ) -> RepositoryResult<Vec<StoredEntity>> {
        let mut state = self.lock()?;
        state.lookup_calls += 1;
        if state.faults.lookups {
            return Err(RepositoryError::Unavailable("lookup rejected".to_string()));
        }

        let wanted: HashSet<&EntityKey> = keys.iter().collect();
        Ok(state
            .entities
            .iter()
            .filter(|e| e.record.kind() == kind)
            .filter(|e| e.record.natural_keys().iter().any(|k| wanted.contains(k)))
            .cloned()
            .collect())
    }

    async fn insert_entities(
        &self,
        entities: Vec<EntityRecord>,
    ) -> RepositoryResult<Vec<StoredEntity>> {
        let mut state = self.lock()?;
        state.entity_insert_calls += 1;
        if state.faults.entity_inserts {
            return Err(RepositoryError::Unavailable("entity insert rejected".to_string()));
        }
        state.check_unique(&entities)?;
        Ok(state.push_entities(entities))
    }

    async fn insert_records(&self, records: Vec<EntityRecord>) -> RepositoryResult<usize> {
        let mut state = self.lock()?;
        state.record_insert_calls += 1;
        let call = state.record_insert_calls;
        if state.faults.record_insert_calls.contains(&call) {
            return Err(RepositoryError::Unavailable(format!(
                "insert call {} rejected",
                call
            )));
        }
        state.check_unique(&records)?;
        Ok(state.push_entities(records).len())
    }

    async fn update_record(&self, id: &str, record: EntityRecord) -> RepositoryResult<()> {
        let mut state = self.lock()?;
        state.update_calls += 1;
        match state.entities.iter_mut().find(|e| e.id == id) {
            Some(entity) => {
                entity.record = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: record.kind().to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn insert_document(&self, header: DocumentHeader) -> RepositoryResult<String> {
        let mut state = self.lock()?;
        if state.faults.documents.contains(header.document_number()) {
            return Err(RepositoryError::Unavailable(format!(
                "document {} rejected",
                header.document_number()
            )));
        }
        if !state.entities.iter().any(|e| e.id == header.customer_id()) {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "customer {} not found",
                header.customer_id()
            )));
        }

        let id = state.allocate_id();
        state.documents.push(StoredDocument {
            id: id.clone(),
            header,
            lines: Vec::new(),
        });
        Ok(id)
    }

    async fn insert_document_lines(
        &self,
        document_id: &str,
        lines: Vec<LineItem>,
    ) -> RepositoryResult<usize> {
        let mut state = self.lock()?;
        let number = match state.documents.iter().find(|d| d.id == document_id) {
            Some(doc) => doc.header.document_number().to_string(),
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "document".to_string(),
                    id: document_id.to_string(),
                })
            }
        };
        if state.faults.lines_of.contains(&number) {
            return Err(RepositoryError::Unavailable(format!(
                "lines of {} rejected",
                number
            )));
        }

        let count = lines.len();
        if let Some(doc) = state.documents.iter_mut().find(|d| d.id == document_id) {
            doc.lines.extend(lines);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompanyRecord;

    fn company(name: &str) -> EntityRecord {
        EntityRecord::Company(CompanyRecord {
            name: name.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_find_by_normalized_key() {
        let store = InMemoryRecordStore::new();
        store.seed(company("Acme Relief"));

        let found = store
            .find_entities(EntityKind::Company, &[EntityKey::normalized(" ACME  relief")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_nth_insert_call_fails_without_side_effects() {
        let store = InMemoryRecordStore::new().fail_record_insert_call(2);

        assert_eq!(store.insert_records(vec![company("A")]).await.unwrap(), 1);
        assert!(store.insert_records(vec![company("B")]).await.is_err());
        assert_eq!(store.insert_records(vec![company("C")]).await.unwrap(), 1);

        let names: Vec<_> = store
            .entities(EntityKind::Company)
            .into_iter()
            .map(|e| e.record.display_name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_duplicate_in_batch_rejects_whole_batch() {
        let store = InMemoryRecordStore::new();
        let err = store
            .insert_records(vec![company("A"), company("a")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        assert!(store.entities(EntityKind::Company).is_empty());
    }
}

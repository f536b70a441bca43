// ==========================================
// 非营利运营平台 - 实体解析
// ==========================================
// 阶段 4: 自然键 → 存储 ID
// 流程:
// 1. 收集全部有效行的去重自然键
// 2. 一次批量查询
// 3. 未命中的键合成新实体，一次批量新建，ID 写入缓存
// 红线:
// - EntityCache 单次导入内只增不删
// - 每个自然键每次导入最多尝试新建一次
// ==========================================

use crate::domain::{CustomerRecord, EntityKey, EntityKind, EntityRecord, StoredEntity};
use crate::importer::batch_writer::WriteUnit;
use crate::importer::profiles::CustomerRef;
use crate::repository::{RecordStore, RepositoryResult};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// EntityCache
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntity {
    pub id: String,
    /// 导入前已存在（true）或本次导入新建（false）
    pub preexisting: bool,
}

#[derive(Debug, Default)]
pub struct EntityCache {
    entries: HashMap<EntityKey, CachedEntity>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以实体的全部自然键登记；已登记的键不覆盖
    pub fn remember(&mut self, entity: &StoredEntity, preexisting: bool) {
        for key in entity.record.natural_keys() {
            self.entries.entry(key).or_insert_with(|| CachedEntity {
                id: entity.id.clone(),
                preexisting,
            });
        }
    }

    pub fn get(&self, key: &EntityKey) -> Option<&CachedEntity> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// EntityResolver
// ==========================================
pub struct EntityResolver<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    cache: EntityCache,
}

impl<'a, S: RecordStore + ?Sized> EntityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cache: EntityCache::new(),
        }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// 一次批量查询已有实体并写入缓存
    ///
    /// # 返回
    /// - 命中的已有实体（捐赠人合并需要其完整记录）
    pub async fn prefetch(
        &mut self,
        kind: EntityKind,
        keys: &[EntityKey],
    ) -> RepositoryResult<Vec<StoredEntity>> {
        let distinct = dedup_keys(keys);
        if distinct.is_empty() {
            return Ok(Vec::new());
        }

        let found = self.store.find_entities(kind, &distinct).await?;
        for entity in &found {
            self.cache.remember(entity, true);
        }
        info!(kind = %kind, keys = distinct.len(), found = found.len(), "已有实体批量查询完成");
        Ok(found)
    }

    /// 为缓存中没有的键一次性新建实体
    ///
    /// # 参数
    /// - candidates: (自然键, 待新建记录)，同键只取第一条
    ///
    /// # 返回
    /// - 新建数量；失败时缓存不变
    pub async fn create_missing(
        &mut self,
        candidates: Vec<(EntityKey, EntityRecord)>,
    ) -> RepositoryResult<usize> {
        let mut seen = HashSet::new();
        let missing: Vec<EntityRecord> = candidates
            .into_iter()
            .filter(|(key, _)| !self.cache.contains(key) && seen.insert(key.clone()))
            .map(|(_, record)| record)
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let created = self.store.insert_entities(missing).await?;
        for entity in &created {
            self.cache.remember(entity, false);
        }
        debug!(created = created.len(), "缺失实体已新建");
        Ok(created.len())
    }
}

fn dedup_keys(keys: &[EntityKey]) -> Vec<EntityKey> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|k| !k.is_empty() && seen.insert((*k).clone()))
        .cloned()
        .collect()
}

// ==========================================
// 客户合成
// ==========================================

/// 生成客户编码: `<prefix>-<8 位十六进制>`
pub fn generate_customer_code(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, suffix[..8].to_uppercase())
}

/// 由行中引用合成客户记录（源文件无编码时自动生成）
pub fn synthesize_customer(reference: &CustomerRef, code_prefix: &str) -> CustomerRecord {
    CustomerRecord {
        name: reference.name.trim().to_string(),
        customer_code: reference
            .code
            .clone()
            .unwrap_or_else(|| generate_customer_code(code_prefix)),
        email: reference.email.clone(),
    }
}

// ==========================================
// 建或跳过（企业 / 合作伙伴）
// ==========================================

#[derive(Debug, Default)]
pub struct CreateOrSkipPlan {
    /// 待新建（同文件同键折叠）
    pub inserts: Vec<WriteUnit>,
    /// 命中已有记录、无需写入的行
    pub skipped: Vec<usize>,
}

impl CreateOrSkipPlan {
    pub fn row_count(&self) -> usize {
        self.skipped.len() + self.inserts.iter().map(|u| u.rows.len()).sum::<usize>()
    }
}

/// 按主自然键决定每行新建或跳过
pub fn plan_create_or_skip(
    rows: Vec<(usize, EntityRecord)>,
    cache: &EntityCache,
) -> CreateOrSkipPlan {
    let mut plan = CreateOrSkipPlan::default();
    let mut pending: HashMap<EntityKey, usize> = HashMap::new();

    for (row_number, record) in rows {
        let key = record.primary_key();
        if cache.contains(&key) {
            plan.skipped.push(row_number);
        } else if let Some(&slot) = pending.get(&key) {
            plan.inserts[slot].rows.push(row_number);
        } else {
            pending.insert(key, plan.inserts.len());
            plan.inserts.push(WriteUnit {
                record,
                rows: vec![row_number],
            });
        }
    }

    plan
}

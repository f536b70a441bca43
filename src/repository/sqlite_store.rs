// ==========================================
// 非营利运营平台 - SQLite 记录库实现
// ==========================================
// 职责: 实现 RecordStore（使用 rusqlite）
// 红线: 不含导入规则，只做数据读写；每次批量写入一个事务
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::{DocumentHeader, EntityKey, EntityKind, EntityRecord, LineItem, StoredEntity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::RecordStore;
use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// IN 子句单次绑定的自然键上限（主键/次级键各绑定一次）
const LOOKUP_CHUNK: usize = 400;

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 创建新的记录库实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中批量插入实体
    fn insert_entities_tx(
        tx: &Transaction,
        records: Vec<EntityRecord>,
    ) -> RepositoryResult<Vec<StoredEntity>> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO entity_record (id, kind, primary_key, secondary_key, payload)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let id = Uuid::new_v4().to_string();
            let secondary = record.secondary_key().map(|k| k.as_str().to_string());
            stmt.execute(params![
                id,
                record.kind().as_str(),
                record.primary_key().as_str(),
                secondary,
                serde_json::to_string(&record)?,
            ])?;
            stored.push(StoredEntity { id, record });
        }
        Ok(stored)
    }

    /// 读取某种实体的全部记录（按写入顺序）
    pub fn list_entities(&self, kind: EntityKind) -> RepositoryResult<Vec<StoredEntity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload FROM entity_record WHERE kind = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map(params![kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, payload)| {
                Ok(StoredEntity {
                    id,
                    record: serde_json::from_str(&payload)?,
                })
            })
            .collect()
    }

    /// 读取单据单头（按写入顺序）
    pub fn list_documents(&self) -> RepositoryResult<Vec<(String, DocumentHeader)>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, payload FROM document_header ORDER BY created_at, rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, payload)| Ok((id, serde_json::from_str(&payload)?)))
            .collect()
    }

    /// 读取某单头下的明细（按明细序号）
    pub fn list_document_lines(&self, document_id: &str) -> RepositoryResult<Vec<LineItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM document_line WHERE document_id = ?1 ORDER BY line_number",
        )?;
        let payloads = stmt
            .query_map(params![document_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(RepositoryError::from))
            .collect()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_entities(
        &self,
        kind: EntityKind,
        keys: &[EntityKey],
    ) -> RepositoryResult<Vec<StoredEntity>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut found: Vec<StoredEntity> = Vec::new();

        for chunk in keys.chunks(LOOKUP_CHUNK) {
            // 构建 IN 子句的占位符
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let query = format!(
                "SELECT id, payload FROM entity_record \
                 WHERE kind = ? AND (primary_key IN ({0}) OR secondary_key IN ({0}))",
                placeholders
            );

            let mut stmt = conn.prepare(&query)?;

            // 绑定参数: kind, 主键集合, 次级键集合
            let kind_str = kind.as_str();
            let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() * 2 + 1);
            bound.push(&kind_str);
            let key_strs: Vec<&str> = chunk.iter().map(EntityKey::as_str).collect();
            for key in &key_strs {
                bound.push(key);
            }
            for key in &key_strs {
                bound.push(key);
            }

            let rows = stmt
                .query_map(bound.as_slice(), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (id, payload) in rows {
                if found.iter().any(|e| e.id == id) {
                    continue;
                }
                found.push(StoredEntity {
                    id,
                    record: serde_json::from_str(&payload)?,
                });
            }
        }

        Ok(found)
    }

    async fn insert_entities(
        &self,
        entities: Vec<EntityRecord>,
    ) -> RepositoryResult<Vec<StoredEntity>> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let stored = Self::insert_entities_tx(&tx, entities)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(stored)
    }

    async fn insert_records(&self, records: Vec<EntityRecord>) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let count = Self::insert_entities_tx(&tx, records)?.len();
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    async fn update_record(&self, id: &str, record: EntityRecord) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let secondary = record.secondary_key().map(|k| k.as_str().to_string());
        let affected = conn.execute(
            r#"
            UPDATE entity_record
            SET primary_key = ?2, secondary_key = ?3, payload = ?4, updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                id,
                record.primary_key().as_str(),
                secondary,
                serde_json::to_string(&record)?,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: record.kind().to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_document(&self, header: DocumentHeader) -> RepositoryResult<String> {
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        conn.execute(
            r#"
            INSERT INTO document_header (id, kind, document_number, customer_id, total, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                header.kind().as_str(),
                header.document_number(),
                header.customer_id(),
                header.total().to_string(),
                serde_json::to_string(&header)?,
            ],
        )?;
        Ok(id)
    }

    async fn insert_document_lines(
        &self,
        document_id: &str,
        lines: Vec<LineItem>,
    ) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO document_line (document_id, line_number, payload) VALUES (?1, ?2, ?3)",
            )?;
            for line in &lines {
                stmt.execute(params![
                    document_id,
                    line.line_number as i64,
                    serde_json::to_string(line)?,
                ])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerRecord, DonorRecord, SalesOrderHeader};
    use rust_decimal::Decimal;
    use tempfile::NamedTempFile;

    fn temp_store() -> (NamedTempFile, SqliteRecordStore) {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteRecordStore::new(file.path().to_str().unwrap()).unwrap();
        (file, store)
    }

    #[tokio::test]
    async fn test_lookup_matches_secondary_key() {
        let (_file, store) = temp_store();
        let donor = EntityRecord::Donor(DonorRecord {
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            alt_email: Some("ada@home.example".to_string()),
            ..Default::default()
        });
        store.insert_entities(vec![donor]).await.unwrap();

        let found = store
            .find_entities(EntityKind::Donor, &[EntityKey::normalized("ADA@home.example")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_violation_rolls_back_batch() {
        let (_file, store) = temp_store();
        let customer = |name: &str, code: &str| {
            EntityRecord::Customer(CustomerRecord {
                name: name.to_string(),
                customer_code: code.to_string(),
                email: None,
            })
        };

        store.insert_records(vec![customer("Acme", "C-1")]).await.unwrap();
        let err = store
            .insert_records(vec![customer("Beta", "C-2"), customer("acme", "C-3")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        assert_eq!(store.list_entities(EntityKind::Customer).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_document_requires_existing_customer() {
        let (_file, store) = temp_store();
        let header = DocumentHeader::SalesOrder(SalesOrderHeader {
            order_number: "SO-1".to_string(),
            customer_id: "missing".to_string(),
            order_date: None,
            shipment_date: None,
            status: None,
            notes: None,
            total: Decimal::ZERO,
        });

        let err = store.insert_document(header).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }
}

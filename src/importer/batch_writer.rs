// ==========================================
// 非营利运营平台 - 批量写入
// ==========================================
// 阶段 5: 写入记录库
// 红线:
// - 记录库无跨调用事务；某批失败不回滚之前已提交的批次
// - 失败批次的每个源行各记一条 RowError，然后继续下一批
// - 单据: 先写单头，成功后一次写入全部明细
// ==========================================

use crate::domain::{DocumentHeader, EntityRecord, ImportResult, LineItem, RowError};
use crate::i18n::t_with_args;
use crate::importer::progress::ProgressTracker;
use crate::repository::RecordStore;
use tracing::{debug, warn};

/// 新建写入单元（同文件内同键的多行折叠为一个单元）
#[derive(Debug, Clone, PartialEq)]
pub struct WriteUnit {
    pub record: EntityRecord,
    /// 源行号；首行为新建行，其余为折叠行（计入重复数）
    pub rows: Vec<usize>,
}

/// 更新写入单元（合并到已有记录）
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateUnit {
    pub id: String,
    pub record: EntityRecord,
    pub rows: Vec<usize>,
}

/// 一张待写入的单据
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub document_number: String,
    /// 分组首行的源行号
    pub first_row: usize,
    pub header: DocumentHeader,
    pub lines: Vec<LineItem>,
}

pub struct BatchWriter<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    chunk_size: usize,
}

impl<'a, S: RecordStore + ?Sized> BatchWriter<'a, S> {
    pub fn new(store: &'a S, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 无需写入的重复行（命中已有记录）：记成功 + 重复
    pub fn settle_skipped(
        &self,
        rows: &[usize],
        result: &mut ImportResult,
        progress: &mut ProgressTracker<'_>,
    ) {
        for _ in rows {
            result.record_success(1);
            result.record_duplicates(1);
            progress.advance(result);
        }
    }

    /// 分批新建记录（每批一次 insert_records 调用）
    pub async fn write_inserts(
        &self,
        units: Vec<WriteUnit>,
        result: &mut ImportResult,
        progress: &mut ProgressTracker<'_>,
    ) {
        let mut remaining = units.into_iter().peekable();
        let mut batch_no = 0usize;

        while remaining.peek().is_some() {
            batch_no += 1;
            let chunk: Vec<WriteUnit> = remaining.by_ref().take(self.chunk_size).collect();
            let (records, row_sets): (Vec<EntityRecord>, Vec<Vec<usize>>) =
                chunk.into_iter().map(|u| (u.record, u.rows)).unzip();

            match self.store.insert_records(records).await {
                Ok(written) => {
                    debug!(batch = batch_no, written, "批次写入成功");
                    for rows in &row_sets {
                        for (i, _) in rows.iter().enumerate() {
                            result.record_success(1);
                            if i > 0 {
                                result.record_duplicates(1);
                            }
                            progress.advance(result);
                        }
                    }
                }
                Err(e) => {
                    let rows: usize = row_sets.iter().map(Vec::len).sum();
                    warn!(batch = batch_no, rows, error = %e, "批次写入失败，继续下一批");
                    let message = t_with_args("import.batch_failed", &[("error", &e.to_string())]);
                    for &row in row_sets.iter().flatten() {
                        result.record_failure(RowError::at_row(row, message.clone()));
                        progress.advance(result);
                    }
                }
            }
        }
    }

    /// 逐条更新已有记录（每条一次 update_record 调用）
    pub async fn write_updates(
        &self,
        units: Vec<UpdateUnit>,
        result: &mut ImportResult,
        progress: &mut ProgressTracker<'_>,
    ) {
        for unit in units {
            let kind = unit.record.kind();
            match self.store.update_record(&unit.id, unit.record).await {
                Ok(()) => {
                    for _ in &unit.rows {
                        result.record_success(1);
                        result.record_duplicates(1);
                        progress.advance(result);
                    }
                }
                Err(e) => {
                    warn!(id = %unit.id, rows = unit.rows.len(), error = %e, "更新已有记录失败");
                    let message = t_with_args(
                        "import.update_failed",
                        &[("entity", kind.as_str()), ("error", &e.to_string())],
                    );
                    for &row in &unit.rows {
                        result.record_failure(RowError::at_row(row, message.clone()));
                        progress.advance(result);
                    }
                }
            }
        }
    }

    /// 写入一张单据（单头 → 明细）
    ///
    /// # 计数
    /// - 单头失败: 失败 +1，跳过明细
    /// - 单头成功: 成功 +1；明细失败只记明细级错误（保留孤立单头）
    pub async fn write_document(&self, doc: DocumentWrite, result: &mut ImportResult) {
        let document_id = match self.store.insert_document(doc.header).await {
            Ok(id) => id,
            Err(e) => {
                warn!(document = %doc.document_number, error = %e, "单头写入失败，跳过明细");
                result.record_failure(RowError::for_document(
                    &doc.document_number,
                    doc.first_row,
                    t_with_args("import.document_failed", &[("error", &e.to_string())]),
                ));
                return;
            }
        };
        result.record_success(1);

        if doc.lines.is_empty() {
            return;
        }
        let line_count = doc.lines.len();
        if let Err(e) = self.store.insert_document_lines(&document_id, doc.lines).await {
            warn!(document = %doc.document_number, lines = line_count, error = %e, "明细写入失败，单头保留");
            result.record_item_error(RowError::for_document(
                &doc.document_number,
                doc.first_row,
                t_with_args(
                    "import.lines_failed",
                    &[("count", &line_count.to_string()), ("error", &e.to_string())],
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompanyRecord;
    use crate::importer::progress::NoopProgress;
    use crate::repository::InMemoryRecordStore;

    fn unit(name: &str, rows: &[usize]) -> WriteUnit {
        WriteUnit {
            record: EntityRecord::Company(CompanyRecord {
                name: name.to_string(),
                ..Default::default()
            }),
            rows: rows.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_stop_later_chunks() {
        let store = InMemoryRecordStore::new().fail_record_insert_call(2);
        let writer = BatchWriter::new(&store, 2);
        let units = (0..5).map(|i| unit(&format!("Org {i}"), &[i + 2])).collect();

        let mut result = ImportResult::new();
        let mut sink = NoopProgress;
        let mut progress = ProgressTracker::new(&mut sink, 5);
        writer.write_inserts(units, &mut result, &mut progress).await;

        assert_eq!(store.record_insert_calls(), 3);
        assert_eq!(result.success_count, 3);
        assert_eq!(result.failure_count, 2);
        let failed: Vec<usize> = result.errors.iter().map(|e| e.row_number).collect();
        assert_eq!(failed, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_folded_rows_count_as_duplicates() {
        let store = InMemoryRecordStore::new();
        let writer = BatchWriter::new(&store, 50);

        let mut result = ImportResult::new();
        let mut sink = NoopProgress;
        let mut progress = ProgressTracker::new(&mut sink, 3);
        writer
            .write_inserts(vec![unit("Acme", &[2, 5, 9])], &mut result, &mut progress)
            .await;

        assert_eq!(result.success_count, 3);
        assert_eq!(result.duplicate_count, 2);
    }
}

// ==========================================
// 非营利运营平台 - 导入编排器
// ==========================================
// 职责: 串联导入管道各阶段，汇总 ImportResult
// 阶段: Parsing → ResolvingEntities → Grouping(单据类) → Writing → Done
// 策略:
// - 捐赠人: 合并（命中已有记录则更新）
// - 企业 / 合作伙伴: 建或跳过
// - 销售订单 / 发票: 解析客户 → 按单据分组 → 单头 + 明细
// 红线:
// - 每次导入至多一次批量查询 + 一次客户批量新建
// - 行级问题全部累积为 RowError，致命错误在任何写入前返回
// ==========================================

use crate::config::{ImportConfigReader, DEFAULT_BATCH_SIZE, DEFAULT_CUSTOMER_CODE_PREFIX};
use crate::domain::{
    CanonicalField, CanonicalRow, DocumentGroup, DonorRecord, EntityKey, EntityKind, EntityRecord, ImportKind,
    ImportPhase, ImportResult, LineItem, RowError,
};
use crate::i18n::{self, t_with_args};
use crate::importer::batch_writer::{BatchWriter, DocumentWrite};
use crate::importer::column_resolver::{AliasTable, ColumnResolver};
use crate::importer::donor_merge::{plan_donor_merge, DonorMergePlan};
use crate::importer::entity_resolver::{
    plan_create_or_skip, synthesize_customer, CreateOrSkipPlan, EntityResolver,
};
use crate::importer::error::ImportError;
use crate::importer::field_normalizer::FieldNormalizer;
use crate::importer::grouper::Grouper;
use crate::importer::importer_trait::RecordImporter;
use crate::importer::profiles::{
    CompanyProfile, CustomerRef, DocumentProfile, DonorProfile, FlatProfile, ImportProfile,
    InvoiceProfile, PartnerProfile, SalesOrderProfile,
};
use crate::importer::progress::{LogProgress, ProgressSink, ProgressTracker};
use crate::importer::row_validator::RowValidator;
use crate::importer::tokenizer::CsvTokenizer;
use crate::repository::{RecordStore, RepositoryError};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// PhaseTracker - 阶段状态机（只进不退）
// ==========================================
#[derive(Debug)]
pub struct PhaseTracker {
    kind: ImportKind,
    phase: ImportPhase,
}

impl PhaseTracker {
    pub fn new(kind: ImportKind) -> Self {
        debug!(kind = %kind, phase = %ImportPhase::Parsing, "导入阶段");
        Self {
            kind,
            phase: ImportPhase::Parsing,
        }
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    /// 进入下一阶段
    ///
    /// # 返回
    /// - false: 目标阶段不在当前阶段之后，保持不变
    pub fn enter(&mut self, next: ImportPhase) -> bool {
        if next <= self.phase {
            warn!(kind = %self.kind, from = %self.phase, to = %next, "忽略阶段回退");
            return false;
        }
        debug!(kind = %self.kind, from = %self.phase, to = %next, "导入阶段");
        self.phase = next;
        true
    }
}

// 单次导入生效的配置
#[derive(Debug, Clone)]
struct RunSettings {
    batch_size: usize,
    customer_code_prefix: String,
    aliases: HashMap<String, Vec<String>>,
}

// 待解析客户的单据行
struct PendingLine<F: CanonicalField> {
    row: CanonicalRow<F>,
    document_number: String,
    customer: EntityKey,
}

// ==========================================
// ImportOrchestrator
// ==========================================
pub struct ImportOrchestrator<S, C>
where
    S: RecordStore,
    C: ImportConfigReader,
{
    store: S,
    config: C,
}

impl<S, C> ImportOrchestrator<S, C>
where
    S: RecordStore,
    C: ImportConfigReader,
{
    /// 创建编排器
    ///
    /// # 参数
    /// - store: 记录库
    /// - config: 导入配置读取器
    pub fn new(store: S, config: C) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// 执行一次导入
    ///
    /// # 返回
    /// - Err: 文件级致命错误；此时进度回调恰好收到一次 (0, 0, 0, 0)
    #[instrument(skip(self, text, progress), fields(kind = %kind, bytes = text.len()))]
    pub async fn run(
        &self,
        kind: ImportKind,
        text: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError> {
        let settings = self.load_settings(kind).await;

        let outcome = match kind {
            ImportKind::Donors => self.run_donors(text, &settings, progress).await,
            ImportKind::SalesOrders => {
                self.run_documents::<SalesOrderProfile>(text, &settings, progress)
                    .await
            }
            ImportKind::Invoices => {
                self.run_documents::<InvoiceProfile>(text, &settings, progress)
                    .await
            }
            ImportKind::Companies => {
                self.run_flat::<CompanyProfile>(text, &settings, progress)
                    .await
            }
            ImportKind::Partners => {
                self.run_flat::<PartnerProfile>(text, &settings, progress)
                    .await
            }
        };

        match &outcome {
            Ok(result) => info!(
                success = result.success_count,
                failed = result.failure_count,
                duplicates = result.duplicate_count,
                errors = result.errors.len(),
                "导入完成"
            ),
            Err(e) => {
                error!(error = %e, "导入中止");
                progress.report(0, 0, 0, 0);
            }
        }
        outcome
    }

    /// 执行一次导入；致命错误折叠为只含顶层错误的 ImportResult
    pub async fn run_or_report(
        &self,
        kind: ImportKind,
        text: &str,
        progress: &mut dyn ProgressSink,
    ) -> ImportResult {
        match self.run(kind, text, progress).await {
            Ok(result) => result,
            Err(e) => ImportResult::fatal(e.user_message()),
        }
    }

    // ==========================================
    // 配置
    // ==========================================

    async fn load_settings(&self, kind: ImportKind) -> RunSettings {
        let batch_size = match self.config.get_batch_size().await {
            Ok(size) => size.max(1),
            Err(e) => {
                warn!(error = %e, "读取批大小失败，使用默认值");
                DEFAULT_BATCH_SIZE
            }
        };
        let customer_code_prefix = match self.config.get_customer_code_prefix().await {
            Ok(prefix) => prefix,
            Err(e) => {
                warn!(error = %e, "读取客户编码前缀失败，使用默认值");
                DEFAULT_CUSTOMER_CODE_PREFIX.to_string()
            }
        };
        match self.config.get_locale().await {
            Ok(locale) if locale != i18n::current_locale() => {
                if i18n::set_locale(&locale) {
                    debug!(locale = %locale, "切换错误消息语言");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "读取语言设置失败，保持当前语言"),
        }
        let aliases = match self.config.get_alias_overrides(kind).await {
            Ok(aliases) => aliases,
            Err(e) => {
                warn!(error = %e, "读取列别名失败，仅使用内置别名");
                HashMap::new()
            }
        };
        RunSettings {
            batch_size,
            customer_code_prefix,
            aliases,
        }
    }

    // ==========================================
    // 建或跳过（企业 / 合作伙伴）
    // ==========================================

    async fn run_flat<P: FlatProfile>(
        &self,
        text: &str,
        settings: &RunSettings,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError> {
        let mut phases = PhaseTracker::new(P::KIND);
        let mut result = ImportResult::new();
        let (rows, row_total) = parse_rows::<P>(text, &settings.aliases, &mut result)?;

        phases.enter(ImportPhase::ResolvingEntities);
        let records: Vec<(usize, EntityRecord)> = rows
            .iter()
            .map(|row| (row.row_number, P::to_record(row)))
            .collect();
        let keys: Vec<EntityKey> = records.iter().map(|(_, r)| r.primary_key()).collect();

        let mut resolver = EntityResolver::new(&self.store);
        let plan = match resolver.prefetch(P::ENTITY, &keys).await {
            Ok(_) => plan_create_or_skip(records, resolver.cache()),
            Err(e) => {
                fail_lookup(P::ENTITY, records.iter().map(|(row, _)| *row), &e, &mut result);
                CreateOrSkipPlan::default()
            }
        };
        debug!(
            rows = plan.row_count(),
            inserts = plan.inserts.len(),
            skipped = plan.skipped.len(),
            "建或跳过计划"
        );

        phases.enter(ImportPhase::Writing);
        let writer = BatchWriter::new(&self.store, settings.batch_size);
        let mut tracker = ProgressTracker::new(progress, row_total);
        tracker.settle_failed_rows(result.failure_count, &result);
        writer.settle_skipped(&plan.skipped, &mut result, &mut tracker);
        writer
            .write_inserts(plan.inserts, &mut result, &mut tracker)
            .await;
        tracker.finish(&result);

        phases.enter(ImportPhase::Done);
        Ok(result)
    }

    // ==========================================
    // 合并（捐赠人）
    // ==========================================

    async fn run_donors(
        &self,
        text: &str,
        settings: &RunSettings,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError> {
        let mut phases = PhaseTracker::new(ImportKind::Donors);
        let mut result = ImportResult::new();
        let (rows, row_total) = parse_rows::<DonorProfile>(text, &settings.aliases, &mut result)?;

        phases.enter(ImportPhase::ResolvingEntities);
        let donors: Vec<(usize, DonorRecord)> = rows
            .iter()
            .map(|row| (row.row_number, DonorProfile::donor(row)))
            .collect();
        // 主邮箱与备用邮箱都参与查询
        let keys: Vec<EntityKey> = donors
            .iter()
            .flat_map(|(_, d)| {
                std::iter::once(EntityKey::normalized(&d.email))
                    .chain(d.alt_email.as_deref().map(EntityKey::normalized))
            })
            .collect();

        let mut resolver = EntityResolver::new(&self.store);
        let plan = match resolver.prefetch(EntityKind::Donor, &keys).await {
            Ok(existing) => plan_donor_merge(donors, &existing),
            Err(e) => {
                fail_lookup(EntityKind::Donor, donors.iter().map(|(row, _)| *row), &e, &mut result);
                DonorMergePlan::default()
            }
        };
        debug!(
            rows = plan.row_count(),
            updates = plan.updates.len(),
            inserts = plan.inserts.len(),
            "捐赠人合并计划"
        );

        phases.enter(ImportPhase::Writing);
        let writer = BatchWriter::new(&self.store, settings.batch_size);
        let mut tracker = ProgressTracker::new(progress, row_total);
        tracker.settle_failed_rows(result.failure_count, &result);
        writer
            .write_updates(plan.updates, &mut result, &mut tracker)
            .await;
        writer
            .write_inserts(plan.inserts, &mut result, &mut tracker)
            .await;
        tracker.finish(&result);

        phases.enter(ImportPhase::Done);
        Ok(result)
    }

    // ==========================================
    // 单头 + 明细（销售订单 / 发票）
    // ==========================================

    async fn run_documents<P: DocumentProfile>(
        &self,
        text: &str,
        settings: &RunSettings,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError> {
        let mut phases = PhaseTracker::new(P::KIND);
        let mut result = ImportResult::new();
        let (rows, _) = parse_rows::<P>(text, &settings.aliases, &mut result)?;

        phases.enter(ImportPhase::ResolvingEntities);
        let mut pending: Vec<PendingLine<P::Field>> = Vec::with_capacity(rows.len());
        // 去重客户引用（同键取首行）
        let mut references: Vec<(EntityKey, CustomerRef)> = Vec::new();
        for row in rows {
            let (Some(document_number), Some(customer)) = (P::document_number(&row), P::customer(&row))
            else {
                let field = if P::document_number(&row).is_none() {
                    "document_number"
                } else {
                    "customer_name"
                };
                result.record_failure(RowError::at_row(
                    row.row_number,
                    t_with_args("import.missing_field", &[("field", field)]),
                ));
                continue;
            };
            let key = EntityKey::normalized(&customer.name);
            if !references.iter().any(|(k, _)| *k == key) {
                references.push((key.clone(), customer));
            }
            pending.push(PendingLine {
                row,
                document_number,
                customer: key,
            });
        }

        let mut resolver = EntityResolver::new(&self.store);
        let keys: Vec<EntityKey> = references.iter().map(|(k, _)| k.clone()).collect();
        let mut resolve_error: Option<String> = None;
        match resolver.prefetch(EntityKind::Customer, &keys).await {
            Ok(_) => {
                let missing: Vec<(EntityKey, EntityRecord)> = references
                    .iter()
                    .filter(|(key, _)| !resolver.cache().contains(key))
                    .map(|(key, reference)| {
                        let record = synthesize_customer(reference, &settings.customer_code_prefix);
                        (key.clone(), EntityRecord::Customer(record))
                    })
                    .collect();
                match resolver.create_missing(missing).await {
                    Ok(created) => debug!(created, "客户解析完成"),
                    Err(e) => {
                        warn!(error = %e, "客户批量新建失败");
                        resolve_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                fail_lookup(
                    EntityKind::Customer,
                    pending.iter().map(|line| line.row.row_number),
                    &e,
                    &mut result,
                );
                pending.clear();
            }
        }

        // 关联客户 ID；引用已有客户的行计入重复数
        let mut resolved = Vec::with_capacity(pending.len());
        for line in pending {
            match resolver.cache().get(&line.customer) {
                Some(entity) => {
                    if entity.preexisting {
                        result.record_duplicates(1);
                    }
                    resolved.push((line.document_number, (line.row, entity.id.clone())));
                }
                None => {
                    let name = references
                        .iter()
                        .find(|(k, _)| *k == line.customer)
                        .map(|(_, r)| r.name.as_str())
                        .unwrap_or_else(|| line.customer.as_str());
                    let message = t_with_args(
                        "import.entity_unresolved",
                        &[
                            ("entity", EntityKind::Customer.as_str()),
                            ("key", name),
                            ("error", resolve_error.as_deref().unwrap_or("not found")),
                        ],
                    );
                    result.record_failure(RowError::at_row(line.row.row_number, message));
                }
            }
        }

        phases.enter(ImportPhase::Grouping);
        let groups = Grouper::group_by_document(resolved);
        debug!(groups = groups.len(), "单据分组完成");

        phases.enter(ImportPhase::Writing);
        let writer = BatchWriter::new(&self.store, settings.batch_size);
        // 进度按单据计；写入前的行级失败不计入 failed
        let mut tracker =
            ProgressTracker::new(progress, groups.len()).excluding_failures(result.failure_count);
        for group in groups {
            if let Some(doc) = build_document::<P>(group) {
                writer.write_document(doc, &mut result).await;
            }
            tracker.advance(&result);
        }
        tracker.finish(&result);

        phases.enter(ImportPhase::Done);
        Ok(result)
    }
}

// ==========================================
// 管道辅助函数
// ==========================================

/// 分词 → 列绑定 → 规范化 → 派生 → 校验
///
/// # 返回
/// - (通过校验的行（源文件顺序）, 数据行总数)；失败行已记入 result
fn parse_rows<P: ImportProfile>(
    text: &str,
    aliases: &HashMap<String, Vec<String>>,
    result: &mut ImportResult,
) -> Result<(Vec<CanonicalRow<P::Field>>, usize), ImportError> {
    let rows = CsvTokenizer::new(text).rows()?;
    let table = AliasTable::with_overrides::<P>(aliases);
    let resolver = ColumnResolver::bind(&table, rows.headers(), P::required())?;

    let mut valid = Vec::new();
    let mut total = 0usize;
    for raw in rows {
        let raw = raw?;
        total += 1;
        let mut row = FieldNormalizer::normalize(&resolver.resolve(&raw));
        P::derive(&mut row);
        match RowValidator::<P>::validate(&row) {
            Ok(()) => valid.push(row),
            Err(err) => {
                debug!(row = err.row_number, message = %err.message, "行校验失败");
                result.record_failure(err);
            }
        }
    }

    info!(kind = %P::KIND, rows = total, valid = valid.len(), "解析完成");
    Ok((valid, total))
}

fn fail_lookup(
    entity: EntityKind,
    rows: impl Iterator<Item = usize>,
    err: &RepositoryError,
    result: &mut ImportResult,
) {
    warn!(entity = %entity, error = %err, "已有实体批量查询失败，相关行全部失败");
    let message = t_with_args(
        "import.lookup_failed",
        &[("entity", entity.as_str()), ("error", &err.to_string())],
    );
    for row in rows {
        result.record_failure(RowError::at_row(row, message.clone()));
    }
}

/// 一组明细行 → 待写入单据（单头字段取首行，合计 = 明细金额之和）
fn build_document<P: DocumentProfile>(
    group: DocumentGroup<(CanonicalRow<P::Field>, String)>,
) -> Option<DocumentWrite> {
    let (first, customer_id) = group.items.first()?;
    let lines: Vec<LineItem> = group
        .items
        .iter()
        .enumerate()
        .map(|(i, (row, _))| P::line(row, i + 1))
        .collect();
    let total = lines.iter().map(|line| line.amount).sum();
    let header = P::header(first, &group.document_number, customer_id, total);

    Some(DocumentWrite {
        first_row: first.row_number,
        document_number: group.document_number,
        header,
        lines,
    })
}

// ==========================================
// RecordImporter 实现
// ==========================================
#[async_trait]
impl<S, C> RecordImporter for ImportOrchestrator<S, C>
where
    S: RecordStore,
    C: ImportConfigReader,
{
    async fn import_from_csv(
        &self,
        kind: ImportKind,
        text: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError> {
        self.run(kind, text, progress).await
    }

    #[instrument(skip(self, file_path, progress), fields(kind = %kind))]
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        kind: ImportKind,
        file_path: P,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportResult, ImportError> {
        let path = file_path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = ImportError::FileRead {
                    path: path.display().to_string(),
                    message: e.to_string(),
                };
                error!(error = %err, "读取导入文件失败");
                progress.report(0, 0, 0, 0);
                return Err(err);
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        info!(file = %path.display(), bytes = bytes.len(), "开始导入文件");
        self.run(kind, &text, progress).await
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        kind: ImportKind,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportResult, ImportError>> {
        info!(kind = %kind, count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.into_iter().map(|path| async move {
            let path_str = path.as_ref().display().to_string();
            let mut progress = LogProgress::new(path_str.clone());
            match self.import_file(kind, path.as_ref(), &mut progress).await {
                Ok(result) => {
                    info!(
                        file = %path_str,
                        success = result.success_count,
                        failed = result.failure_count,
                        "文件导入成功"
                    );
                    Ok(result)
                }
                Err(e) => {
                    error!(file = %path_str, error = %e, "文件导入失败");
                    Err(e)
                }
            }
        });

        let results = join_all(import_tasks).await;

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        info!(
            total = results.len(),
            success = success_count,
            failed = results.len() - success_count,
            "批量导入完成"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::i18n::LOCALE_TEST_LOCK;
    use crate::importer::progress::NoopProgress;
    use crate::repository::InMemoryRecordStore;
    use std::sync::MutexGuard;

    // 导入会按配置切换全局语言
    fn locale_guard() -> MutexGuard<'static, ()> {
        LOCALE_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_phase_only_moves_forward() {
        let mut phases = PhaseTracker::new(ImportKind::SalesOrders);
        assert!(phases.enter(ImportPhase::ResolvingEntities));
        assert!(phases.enter(ImportPhase::Writing));
        assert!(!phases.enter(ImportPhase::Grouping));
        assert!(!phases.enter(ImportPhase::Writing));
        assert_eq!(phases.phase(), ImportPhase::Writing);
        assert!(phases.enter(ImportPhase::Done));
    }

    #[tokio::test]
    async fn test_company_rows_created_or_skipped() {
        let _guard = locale_guard();
        let store = InMemoryRecordStore::new();
        store.seed(EntityRecord::Company(crate::domain::CompanyRecord {
            name: "Acme".to_string(),
            ..Default::default()
        }));
        let orchestrator = ImportOrchestrator::new(store, ImportSettings::new());

        let csv = "Company Name,City\nACME,Dayton\nBeta LLC,Akron\n,Nowhere\n";
        let result = orchestrator
            .run(ImportKind::Companies, csv, &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.duplicate_count, 1);
        assert_eq!(result.errors[0].row_number, 4);
        assert_eq!(orchestrator.store().entities(EntityKind::Company).len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_rows_without_writes() {
        let _guard = locale_guard();
        let store = InMemoryRecordStore::new().fail_lookups();
        let orchestrator = ImportOrchestrator::new(store, ImportSettings::new());

        let csv = "Name,Email\nAda,ada@example.org\nGrace,grace@example.org\n";
        let result = orchestrator
            .run(ImportKind::Donors, csv, &mut NoopProgress)
            .await
            .unwrap();

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 2);
        assert_eq!(orchestrator.store().record_insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_fatal_error_reports_zero_progress_once() {
        let _guard = locale_guard();
        let orchestrator = ImportOrchestrator::new(InMemoryRecordStore::new(), ImportSettings::new());
        let mut calls = Vec::new();
        let mut sink = |c: usize, t: usize, s: usize, f: usize| calls.push((c, t, s, f));

        let result = orchestrator
            .run_or_report(ImportKind::Invoices, "  \n\n", &mut sink)
            .await;

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(calls, vec![(0, 0, 0, 0)]);
    }

    #[tokio::test]
    async fn test_configured_locale_applies_to_row_errors() {
        let _guard = locale_guard();
        let settings = ImportSettings::new().with_locale("zh-CN");
        let orchestrator = ImportOrchestrator::new(InMemoryRecordStore::new(), settings);

        let result = orchestrator
            .run(ImportKind::Donors, "Name,Email
Ada,
", &mut NoopProgress)
            .await
            .unwrap();
        assert_eq!(i18n::current_locale(), "zh-CN");
        assert!(result.errors[0].message.contains("必填"));

        i18n::set_locale("en");
    }
}

// ==========================================
// 导入管道集成测试
// ==========================================
// 测试目标: 分词 / 规范化 / 校验 / 计数 / 进度 / 致命错误
// ==========================================


use chrono::NaiveDate;
use nonprofit_import::domain::{EntityKind, EntityRecord, ImportKind};
use nonprofit_import::importer::{ImportError, NoopProgress};
use nonprofit_import::logging;
use nonprofit_import::repository::InMemoryRecordStore;
use test_helpers::{memory_orchestrator, ProgressLog};

#[tokio::test]
async fn test_quoted_fields_keep_commas_and_quotes() {
    logging::init_test();

    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "Company Name,Notes,City\n\
               \"Acme, Inc.\",\"Line one, line two\",Dayton\n\
               \"Beta \"\"B\"\" Co\",,Akron\n";

    let result = orchestrator
        .run(ImportKind::Companies, csv, &mut NoopProgress)
        .await
        .expect("import should not be fatal");

    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 0);

    let mut names: Vec<String> = orchestrator
        .store()
        .entities(EntityKind::Company)
        .into_iter()
        .map(|e| e.record.display_name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Acme, Inc.", "Beta \"B\" Co"]);
}

#[tokio::test]
async fn test_stray_quote_only_affects_its_own_row() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "Company Name,City\n\"Acme,Dayton\nBeta,Akron\nGamma,Kent\nDelta,Canton\n";
    let mut progress = ProgressLog::default();

    let result = orchestrator
        .run(ImportKind::Companies, csv, &mut progress)
        .await
        .unwrap();

    assert_eq!(result.success_count + result.failure_count, 4);
    assert_eq!(result.success_count, 4);
    assert_eq!(progress.last(), Some((4, 4, 4, 0)));

    let mut names: Vec<String> = orchestrator
        .store()
        .entities(EntityKind::Company)
        .into_iter()
        .map(|e| e.record.display_name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Acme,Dayton", "Beta", "Delta", "Gamma"]);
}

#[tokio::test]
async fn test_primary_date_formats_parse_to_same_day() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "Name,Email,First Donation Date\n\
               Ada,ada@example.org,05 Mar 2024\n\
               Grace,grace@example.org,2024-03-05\n\
               Linus,linus@example.org,03/05/2024\n\
               Ken,ken@example.org,not a date\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();
    assert_eq!(result.success_count, 4);

    let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
    for entity in orchestrator.store().entities(EntityKind::Donor) {
        let EntityRecord::Donor(donor) = entity.record else {
            panic!("expected donor record");
        };
        if donor.email == "ken@example.org" {
            assert_eq!(donor.first_donation_date, None);
        } else {
            assert_eq!(donor.first_donation_date, expected, "{}", donor.email);
        }
    }
}

#[tokio::test]
async fn test_missing_required_field_yields_one_error_with_row_number() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "Name,Email\n\
               Ada,ada@example.org\n\
               Grace,\n\
               Linus,linus@example.org\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row_number, 3);
    assert!(result.errors[0].message.contains("email"));
    assert_eq!(orchestrator.store().entities(EntityKind::Donor).len(), 2);
}

#[tokio::test]
async fn test_every_row_counted_exactly_once() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 2);
    let csv = "Partner Name,Email,Zip\n\
               Food Bank,info@foodbank.org,45402\n\
               Food Bank,info@foodbank.org,45402\n\
               Shelter,not-an-email,45403\n\
               ,missing@example.org,45404\n\
               Library,desk@library.org,45405\n";

    let result = orchestrator
        .run(ImportKind::Partners, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count + result.failure_count, 5);
    assert_eq!(result.success_count, 3);
    assert_eq!(result.failure_count, 2);
    // 同文件第二行 Food Bank 折叠为重复
    assert_eq!(result.duplicate_count, 1);
    assert_eq!(orchestrator.store().entities(EntityKind::Partner).len(), 2);
}

#[tokio::test]
async fn test_final_progress_reported_exactly_once() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 1);
    let csv = "Name,Email\n\
               Ada,ada@example.org\n\
               Grace,broken\n\
               Linus,linus@example.org\n";
    let mut progress = ProgressLog::default();

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut progress)
        .await
        .unwrap();

    // 三行数据: 第 3 行校验失败先推进，其余两行逐行写入
    assert_eq!(progress.completions(), 1);
    assert_eq!(progress.calls, vec![(1, 3, 0, 1), (2, 3, 1, 1), (3, 3, 2, 1)]);
    assert_eq!(
        progress.last(),
        Some((3, 3, result.success_count, result.failure_count))
    );
    assert_eq!(result.success_count + result.failure_count, 3);
}

#[tokio::test]
async fn test_header_only_file_reports_zero_of_zero() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let mut progress = ProgressLog::default();

    let result = orchestrator
        .run(ImportKind::Companies, "Company Name,City\n", &mut progress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 0);
    assert_eq!(result.failure_count, 0);
    assert_eq!(progress.calls, vec![(0, 0, 0, 0)]);
}

#[tokio::test]
async fn test_empty_file_is_fatal() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let mut progress = ProgressLog::default();

    let err = orchestrator
        .run(ImportKind::Donors, "\n   \n", &mut progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::EmptyFile));
    assert_eq!(progress.calls, vec![(0, 0, 0, 0)]);
    assert_eq!(orchestrator.store().record_insert_calls(), 0);
}

#[tokio::test]
async fn test_missing_columns_is_fatal_before_any_write() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let mut progress = ProgressLog::default();

    let result = orchestrator
        .run_or_report(ImportKind::SalesOrders, "Foo,Bar\n1,2\n", &mut progress)
        .await;

    assert_eq!(result.success_count, 0);
    assert_eq!(result.failure_count, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row_number, 0);
    assert_eq!(progress.calls, vec![(0, 0, 0, 0)]);
    assert_eq!(orchestrator.store().lookup_calls(), 0);
}

#[tokio::test]
async fn test_bom_and_padded_headers_resolve() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "\u{feff} Name , Email \nAda,ada@example.org\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 0);
}

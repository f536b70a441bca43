// ==========================================
// 捐赠人导入集成测试
// ==========================================
// 测试目标: 合并策略（主邮箱 / 备用邮箱命中）、同文件折叠、姓名派生
// ==========================================


use nonprofit_import::domain::{DonorRecord, EntityKind, EntityRecord, ImportKind};
use nonprofit_import::importer::NoopProgress;
use nonprofit_import::repository::InMemoryRecordStore;
use test_helpers::memory_orchestrator;

fn only_donor(store: &InMemoryRecordStore) -> DonorRecord {
    let donors = store.entities(EntityKind::Donor);
    assert_eq!(donors.len(), 1, "expected exactly one donor");
    match donors.into_iter().next().map(|e| e.record) {
        Some(EntityRecord::Donor(d)) => d,
        other => panic!("unexpected record: {:?}", other),
    }
}

#[tokio::test]
async fn test_merge_keeps_existing_phone_when_incoming_blank() {
    let store = InMemoryRecordStore::new();
    store.seed(EntityRecord::Donor(DonorRecord {
        name: "Ada".to_string(),
        email: "ada@example.org".to_string(),
        phone: Some("555-0100".to_string()),
        city: Some("Dayton".to_string()),
        ..Default::default()
    }));
    let orchestrator = memory_orchestrator(store, 50);
    let csv = "Name,Email,Phone,City\nAda Lovelace,ADA@example.org,,Columbus\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(result.duplicate_count, 1);
    assert_eq!(orchestrator.store().update_calls(), 1);
    assert_eq!(orchestrator.store().record_insert_calls(), 0);

    let donor = only_donor(orchestrator.store());
    assert_eq!(donor.name, "Ada Lovelace");
    assert_eq!(donor.email, "ada@example.org");
    assert_eq!(donor.phone.as_deref(), Some("555-0100"));
    assert_eq!(donor.city.as_deref(), Some("Columbus"));
}

#[tokio::test]
async fn test_alt_email_match_updates_existing_donor() {
    let store = InMemoryRecordStore::new();
    store.seed(EntityRecord::Donor(DonorRecord {
        name: "Ada".to_string(),
        email: "ada@example.org".to_string(),
        ..Default::default()
    }));
    let orchestrator = memory_orchestrator(store, 50);
    let csv = "Name,Email,Alternate Email\nAda,ada@home.example,ada@example.org\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(result.duplicate_count, 1);

    let donor = only_donor(orchestrator.store());
    assert_eq!(donor.email, "ada@example.org");
    assert_eq!(donor.alt_email.as_deref(), Some("ada@home.example"));
}

#[tokio::test]
async fn test_same_file_rows_fold_into_one_donor() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "Name,Email,Phone,Total Donated\n\
               Grace Hopper,grace@example.org,555-0101,\n\
               Grace Hopper,GRACE@example.org,,\"$1,250.00\"\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 0);
    assert_eq!(result.duplicate_count, 1);

    let donor = only_donor(orchestrator.store());
    assert_eq!(donor.phone.as_deref(), Some("555-0101"));
    assert_eq!(donor.total_donated.map(|d| d.to_string()), Some("1250.00".to_string()));
}

#[tokio::test]
async fn test_name_built_from_first_and_last_columns() {
    let orchestrator = memory_orchestrator(InMemoryRecordStore::new(), 50);
    let csv = "First Name,Last Name,Email,Recurring\nKatherine,Johnson,kj@example.org,yes\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();
    assert_eq!(result.success_count, 1);

    let donor = only_donor(orchestrator.store());
    assert_eq!(donor.name, "Katherine Johnson");
    assert_eq!(donor.is_recurring, Some(true));
}

#[tokio::test]
async fn test_rows_matching_same_donor_share_one_update() {
    let store = InMemoryRecordStore::new();
    let id = store.seed(EntityRecord::Donor(DonorRecord {
        name: "Ada".to_string(),
        email: "ada@example.org".to_string(),
        ..Default::default()
    }));
    let orchestrator = memory_orchestrator(store, 50);
    // 两行都命中同一已有记录 → 一个更新单元
    let csv = "Name,Email\nAda,ada@example.org\nAda L.,ada@example.org\nBob,bob@example.org\n";

    let result = orchestrator
        .run(ImportKind::Donors, csv, &mut NoopProgress)
        .await
        .unwrap();

    assert_eq!(result.success_count, 3);
    assert_eq!(result.duplicate_count, 2);
    assert_eq!(orchestrator.store().update_calls(), 1);
    assert_eq!(orchestrator.store().entities(EntityKind::Donor).len(), 2);
    let merged = orchestrator
        .store()
        .entities(EntityKind::Donor)
        .into_iter()
        .find(|e| e.id == id)
        .unwrap();
    assert_eq!(merged.record.display_name(), "Ada L.");
}

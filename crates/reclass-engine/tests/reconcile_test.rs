//! End-to-end reconciliation scenarios against in-memory stores.

use std::sync::Arc;

use serde_json::json;

use reclass_core::{
    Attachment, AttachmentRef, MigrationPolicy, Record, RunCounters, StorageCategory,
};
use reclass_db::MemoryRecordRepository;
use reclass_engine::Reconciler;
use reclass_store::mock::{mock_url, MockObjectStore, MockOp};

fn policy() -> MigrationPolicy {
    MigrationPolicy {
        folder: None,
        ..MigrationPolicy::default()
    }
}

fn report(identifier: &str) -> AttachmentRef {
    AttachmentRef::new(
        identifier,
        "report.pdf",
        format!("https://x/{}", identifier),
        StorageCategory::Media,
    )
}

fn photo(identifier: &str) -> AttachmentRef {
    AttachmentRef::new(
        identifier,
        "photo.jpg",
        format!("https://x/{}", identifier),
        StorageCategory::Media,
    )
}

fn known(record: &Record, index: usize) -> &AttachmentRef {
    record.attachments[index]
        .as_known()
        .expect("attachment should have decoded")
}

async fn run(store: &MockObjectStore, repo: &MemoryRecordRepository) -> RunCounters {
    Reconciler::new(Arc::new(store.clone()), Arc::new(repo.clone()), policy())
        .run()
        .await
        .expect("run should start")
}

#[tokio::test]
async fn test_misplaced_pdf_is_relocated_and_persisted() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF-1.4")
        .with_content("https://x/abc", b"%PDF-1.4");
    let repo = MemoryRecordRepository::new(vec![Record::new(7, [report("abc")])]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.fixed, 1);
    assert_eq!(counters.errored, 0);
    assert_eq!(counters.records_updated, 1);

    let record = repo.get(7).unwrap();
    let persisted = known(&record, 0);
    assert_eq!(persisted.identifier, "abc_fixed");
    assert_eq!(
        persisted.url,
        mock_url("abc_fixed", StorageCategory::Document)
    );
    assert_eq!(persisted.original_name.as_deref(), Some("report.pdf"));
    assert_eq!(persisted.category, Some(StorageCategory::Document));
    assert_ne!(persisted.identifier, "abc");
    assert!(!store.contains("abc", StorageCategory::Media));
}

#[tokio::test]
async fn test_missing_object_is_counted_and_not_written() {
    let store = MockObjectStore::new();
    let repo = MemoryRecordRepository::new(vec![Record::new(7, [report("abc")])]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.errored, 1);
    assert_eq!(counters.fixed, 0);
    assert!(repo.writes().is_empty());
    assert_eq!(repo.get(7).unwrap(), Record::new(7, [report("abc")]));
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF")
        .with_content("https://x/abc", b"%PDF");
    let repo = MemoryRecordRepository::new(vec![
        Record::new(1, [report("abc"), photo("img")]),
        Record {
            id: 2,
            attachments: vec![],
        },
    ]);

    let first = run(&store, &repo).await;
    assert_eq!(first.fixed, 1);
    let after_first = repo.snapshot();

    let second = run(&store, &repo).await;
    assert_eq!(second.fixed, 0);
    assert_eq!(second.already_correct, 1);
    assert_eq!(second.records_updated, 0);
    assert_eq!(repo.snapshot(), after_first);
    assert_eq!(repo.writes(), vec![1]);
}

#[tokio::test]
async fn test_upload_failure_leaves_record_unchanged() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF")
        .with_content("https://x/abc", b"%PDF")
        .failing_on(MockOp::Store, None);
    let original = vec![report("abc"), photo("img")];
    let repo = MemoryRecordRepository::new(vec![Record::new(3, original.clone())]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.errored, 1);
    assert!(repo.writes().is_empty());
    assert_eq!(repo.get(3).unwrap(), Record::new(3, original));
    assert!(store.calls_for(MockOp::Delete).is_empty());
}

#[tokio::test]
async fn test_delete_failure_still_persists_fix() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF")
        .with_content("https://x/abc", b"%PDF")
        .failing_on(MockOp::Delete, None);
    let repo = MemoryRecordRepository::new(vec![Record::new(4, [report("abc")])]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.fixed, 1);
    assert_eq!(counters.orphaned, 1);
    assert_eq!(counters.errored, 0);
    assert_eq!(known(&repo.get(4).unwrap(), 0).identifier, "abc_fixed");
}

#[tokio::test]
async fn test_non_candidates_never_touch_the_store() {
    let store = MockObjectStore::new();
    let repo = MemoryRecordRepository::new(vec![Record::new(5, [photo("a"), photo("b")])]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.not_candidate, 2);
    assert!(store.calls().is_empty());
    assert!(repo.writes().is_empty());
}

#[tokio::test]
async fn test_persist_failure_does_not_stop_the_run() {
    let store = MockObjectStore::new()
        .with_object("a", StorageCategory::Media, b"%PDF")
        .with_object("b", StorageCategory::Media, b"%PDF")
        .with_content("https://x/a", b"%PDF")
        .with_content("https://x/b", b"%PDF");
    let repo = MemoryRecordRepository::new(vec![
        Record::new(1, [report("a")]),
        Record::new(2, [report("b")]),
    ])
    .failing_persist_for(1);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.fixed, 2);
    assert_eq!(counters.record_failures, 1);
    assert_eq!(counters.records_updated, 1);
    assert!(counters.has_record_failures());
    assert_eq!(repo.writes(), vec![2]);
    assert_eq!(repo.get(1).unwrap(), Record::new(1, [report("a")]));
}

#[tokio::test]
async fn test_probe_failure_counts_as_error_without_migration() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF")
        .with_content("https://x/abc", b"%PDF")
        .failing_on(MockOp::Exists, Some("abc"));
    let repo = MemoryRecordRepository::new(vec![Record::new(6, [report("abc")])]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.errored, 1);
    assert!(store.calls_for(MockOp::Fetch).is_empty());
    assert!(repo.writes().is_empty());
}

#[tokio::test]
async fn test_mixed_record_keeps_order_and_extra_fields() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF")
        .with_content("https://x/abc", b"%PDF");
    let mut pdf = report("abc");
    pdf.extra.insert("size".to_string(), json!(1024));
    let repo = MemoryRecordRepository::new(vec![Record::new(
        8,
        [photo("first"), pdf, photo("last")],
    )]);

    run(&store, &repo).await;

    let record = repo.get(8).unwrap();
    let ids: Vec<&str> = (0..3)
        .map(|i| known(&record, i).identifier.as_str())
        .collect();
    assert_eq!(ids, vec!["first", "abc_fixed", "last"]);
    assert_eq!(known(&record, 1).extra["size"], json!(1024));
}

#[tokio::test]
async fn test_unreadable_siblings_survive_the_fix() {
    let store = MockObjectStore::new()
        .with_object("abc", StorageCategory::Media, b"%PDF")
        .with_content("https://x/abc", b"%PDF");
    let video = json!({
        "public_id": "clip",
        "original_name": "clip.mp4",
        "url": "https://x/clip",
        "resource_type": "video",
    });
    let no_url = json!({
        "public_id": "draft",
        "original_name": "draft.pdf",
        "url": null,
        "resource_type": "image",
    });
    let repo = MemoryRecordRepository::new(vec![Record {
        id: 9,
        attachments: vec![
            Attachment::Opaque(video.clone()),
            report("abc").into(),
            Attachment::Opaque(no_url.clone()),
        ],
    }]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.fixed, 1);
    assert_eq!(counters.unrecognized, 2);
    assert_eq!(counters.errored, 0);
    assert_eq!(repo.writes(), vec![9]);

    let record = repo.get(9).unwrap();
    assert_eq!(record.attachments.len(), 3);
    assert_eq!(record.attachments[0], Attachment::Opaque(video));
    assert_eq!(known(&record, 1).identifier, "abc_fixed");
    assert_eq!(record.attachments[2], Attachment::Opaque(no_url));
    // only the pdf is looked up, once per category
    let looked_up: Vec<String> = store
        .calls_for(MockOp::Exists)
        .into_iter()
        .map(|c| c.target)
        .collect();
    assert_eq!(looked_up, vec!["abc", "abc"]);
}

#[tokio::test]
async fn test_record_of_only_unreadable_elements_is_not_written() {
    let store = MockObjectStore::new();
    let repo = MemoryRecordRepository::new(vec![Record {
        id: 10,
        attachments: vec![Attachment::Opaque(json!({ "url": null }))],
    }]);

    let counters = run(&store, &repo).await;

    assert_eq!(counters.records_scanned, 1);
    assert_eq!(counters.unrecognized, 1);
    assert!(store.calls().is_empty());
    assert!(repo.writes().is_empty());
}

mod common;

use std::fs;

use allotment_core::{
    domain::{Allocation, EntryPatch, EntryStatus, LedgerEntry, LineItem},
    mode::Mode,
    reconcile::ReconcilePolicy,
    store::{LedgerStore, LocalStore, LEDGER_RECORD},
    Coordinator, LedgerError, ViewState,
};
use common::{local_store, office_allocations, paper_request, temp_dir};

fn start_local(store: LocalStore) -> (Coordinator, allotment_core::Session) {
    Coordinator::start(None, Box::new(store), ReconcilePolicy::TrustSupplied)
        .expect("local session starts")
}

fn seeded_store() -> LocalStore {
    let store = local_store();
    store
        .persist_allocations(&office_allocations())
        .expect("seed allocations");
    store
}

#[test]
fn recomputes_consumed_amounts_on_load() {
    let store = seeded_store();
    store
        .append_or_mutate(&paper_request(), allotment_core::store::Mutation::Create)
        .unwrap();

    let (coordinator, session) = start_local(store);
    assert_eq!(coordinator.mode(), Mode::Local);
    assert!(coordinator.writes_mocked());
    assert_eq!(session.consumed("A1"), Some(2500));
    assert_eq!(session.remaining("A1"), Some(997_500));
    assert_eq!(session.consumed("B2"), Some(0));
    assert_eq!(session.view_state(), ViewState::Reconciled);
}

#[test]
fn submit_patches_consumed_amounts_optimistically() {
    let (coordinator, mut session) = start_local(seeded_store());
    let entry = LedgerEntry::new(
        "Printing",
        vec![
            LineItem::new("B2", "Flyers", 100, 50, 3000),
            LineItem::new("A1", "Pens", 10, 300, 0),
        ],
    );

    let stored = coordinator.submit(&mut session, entry).unwrap();

    assert!(stored.is_local());
    assert_eq!(session.consumed("B2"), Some(8000));
    assert_eq!(session.consumed("A1"), Some(3000));
    assert_eq!(session.view_state(), ViewState::Optimistic);

    coordinator.refresh(&mut session).unwrap();
    assert_eq!(session.consumed("B2"), Some(8000));
    assert_eq!(session.view_state(), ViewState::Reconciled);
}

#[test]
fn unknown_allocation_is_rejected_before_any_write() {
    let store = seeded_store();
    let ledger_path = store.record_path(LEDGER_RECORD);
    let (coordinator, mut session) = start_local(store);
    let entry = LedgerEntry::new("Bad", vec![LineItem::new("A9", "Ghost", 1, 100, 0)]);

    let err = coordinator.submit(&mut session, entry).expect_err("unknown key");

    assert!(err.is_validation());
    assert!(!ledger_path.exists(), "nothing was written");
    assert!(session.entries().is_empty());
    assert_eq!(session.consumed("A1"), Some(0));
}

#[test]
fn update_and_delete_wait_for_a_refresh() {
    let (coordinator, mut session) = start_local(seeded_store());
    let stored = coordinator.submit(&mut session, paper_request()).unwrap();
    coordinator.refresh(&mut session).unwrap();

    let patch = EntryPatch {
        doc_name: None,
        items: Some(vec![LineItem::new("A1", "Paper", 4, 1000, 500)]),
    };
    coordinator.update(&mut session, &stored.id, &patch).unwrap();
    assert_eq!(session.view_state(), ViewState::Stale);
    assert_eq!(session.consumed("A1"), Some(2500), "no incremental adjustment");

    coordinator.refresh(&mut session).unwrap();
    assert_eq!(session.consumed("A1"), Some(4500));
    assert_eq!(session.entry(&stored.id).unwrap().doc_name, "4월 사무용품");

    coordinator.delete(&mut session, &stored.id).unwrap();
    assert_eq!(session.view_state(), ViewState::Stale);
    coordinator.refresh(&mut session).unwrap();
    assert_eq!(session.consumed("A1"), Some(0));
    assert_eq!(
        session.entry(&stored.id).map(|entry| entry.status),
        Some(EntryStatus::Deleted)
    );
}

#[test]
fn unknown_ids_are_reported() {
    let (coordinator, mut session) = start_local(seeded_store());
    let err = coordinator
        .delete(&mut session, "local-missing")
        .expect_err("nothing to delete");
    assert!(matches!(err, LedgerError::UnknownEntry(_)));

    let err = coordinator
        .update(&mut session, "local-missing", &EntryPatch::default())
        .expect_err("nothing to update");
    assert!(matches!(err, LedgerError::UnknownEntry(_)));
}

#[test]
fn corrupt_records_load_as_empty() {
    let store = seeded_store();
    fs::write(store.record_path(LEDGER_RECORD), "{ not json").unwrap();

    let (_, session) = start_local(store);
    assert!(session.entries().is_empty());
    assert_eq!(session.allocations().len(), 2);
}

#[test]
fn import_replaces_allocations_and_reconciles() {
    let (coordinator, mut session) = start_local(seeded_store());
    coordinator.submit(&mut session, paper_request()).unwrap();

    let imported = vec![
        Allocation::new("A1", 2_000_000).with_consumed(1),
        Allocation::new("C3", 10_000),
        Allocation::new("C3", 20_000),
    ];
    coordinator
        .import_allocations(&mut session, imported)
        .unwrap();

    assert_eq!(session.allocations().len(), 3);
    assert_eq!(session.consumed("A1"), Some(2500), "supplied amount is discarded");
    assert_eq!(session.remaining("C3"), Some(10_000), "first duplicate wins");
    assert_eq!(session.view_state(), ViewState::Reconciled);

    let err = coordinator
        .import_allocations(&mut session, vec![Allocation::new("", 1)])
        .expect_err("blank label");
    assert!(err.is_validation());
    assert_eq!(session.allocations().len(), 3);
}

#[test]
fn documents_need_the_remote_backend() {
    let (coordinator, mut session) = start_local(seeded_store());
    let stored = coordinator.submit(&mut session, paper_request()).unwrap();
    let err = coordinator
        .generate_document(&session, &stored.id)
        .expect_err("local store cannot render");
    assert!(matches!(err, LedgerError::Unsupported(_)));
}

#[test]
fn sessions_share_the_data_directory() {
    let dir = temp_dir().join("shared");
    let first = LocalStore::new(dir.clone()).unwrap();
    first.persist_allocations(&office_allocations()).unwrap();
    let (coordinator, mut session) = start_local(first);
    coordinator.submit(&mut session, paper_request()).unwrap();

    let (_, reopened) = start_local(LocalStore::new(dir).unwrap());
    assert_eq!(reopened.active_entries().count(), 1);
    assert_eq!(reopened.consumed("A1"), Some(2500));
}

#[test]
fn entries_stored_without_ids_can_be_deleted() {
    let store = seeded_store();
    fs::write(
        store.record_path(LEDGER_RECORD),
        r#"[{"docName": "old", "items": [{"budgetName": "A1", "name": "Paper", "qty": 2, "price": 1000, "shipping": 500}]}]"#,
    )
    .unwrap();
    let (coordinator, mut session) = start_local(store);
    let id = session.entries()[0].id.clone();
    assert_eq!(session.consumed("A1"), Some(2500));

    coordinator.delete(&mut session, &id).unwrap();
    coordinator.refresh(&mut session).unwrap();

    assert_eq!(session.entry(&id).map(|entry| entry.status), Some(EntryStatus::Deleted));
    assert_eq!(session.consumed("A1"), Some(0));
}

#[test]
fn rename_survives_a_budget_reimport() {
    let (coordinator, mut session) = start_local(seeded_store());
    let stored = coordinator.submit(&mut session, paper_request()).unwrap();
    coordinator
        .import_allocations(&mut session, vec![Allocation::new("Z1", 10_000)])
        .unwrap();

    let rename = EntryPatch {
        doc_name: Some("Renamed".into()),
        items: None,
    };
    coordinator.update(&mut session, &stored.id, &rename).unwrap();
    coordinator.refresh(&mut session).unwrap();
    assert_eq!(session.entry(&stored.id).unwrap().doc_name, "Renamed");

    let repoint = EntryPatch {
        doc_name: None,
        items: Some(vec![LineItem::new("A1", "Paper", 1, 1, 0)]),
    };
    let err = coordinator
        .update(&mut session, &stored.id, &repoint)
        .expect_err("new items must resolve");
    assert!(err.is_validation());
}

use docvault_core::db::open_db_in_memory;
use docvault_core::{RevisionLedger, SqliteRevisionLedger, StoreError};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Simulates a second writer that appends the same version first.
fn install_racing_writer(conn: &Connection) {
    conn.execute_batch(
        "CREATE TEMP TRIGGER racing_writer
         BEFORE INSERT ON revisions
         WHEN NEW.id NOT LIKE 'race-%'
         BEGIN
             INSERT INTO revisions (id, document_id, content, is_markdown, version, saved_at, archived_at)
             VALUES ('race-' || NEW.id, NEW.document_id, 'other', 1, NEW.version, 0, 0);
         END;",
    )
    .unwrap();
}

#[test]
fn latest_version_is_zero_without_history() {
    let conn = setup();
    let ledger = SqliteRevisionLedger::try_new(&conn).unwrap();
    assert_eq!(ledger.latest_version(Uuid::new_v4()).unwrap(), 0);
}

#[test]
fn snapshots_allocate_increasing_versions_per_document() {
    let conn = setup();
    let ledger = SqliteRevisionLedger::try_new(&conn).unwrap();
    let doc_a = Uuid::new_v4();
    let doc_b = Uuid::new_v4();

    let first = ledger.snapshot(doc_a, "A", true, 10).unwrap();
    let second = ledger.snapshot(doc_a, "B", false, 20).unwrap();
    let other = ledger.snapshot(doc_b, "X", true, 30).unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(other.version, 1);
    assert_eq!(first.saved_at, 10);
    assert!(first.archived_at > 0);
    assert_eq!(ledger.latest_version(doc_a).unwrap(), 2);
}

#[test]
fn list_is_newest_first_and_excludes_content() {
    let conn = setup();
    let ledger = SqliteRevisionLedger::try_new(&conn).unwrap();
    let doc = Uuid::new_v4();

    let v1 = ledger.snapshot(doc, "A", true, 1).unwrap();
    let v2 = ledger.snapshot(doc, "B", true, 2).unwrap();
    let v3 = ledger.snapshot(doc, "C", false, 3).unwrap();

    let listed = ledger.list(doc).unwrap();
    assert_eq!(listed, vec![v3.meta(), v2.meta(), v1.meta()]);

    let json = serde_json::to_value(&listed[0]).unwrap();
    assert!(json.get("content").is_none());
    assert_eq!(json["version"], 3);
}

#[test]
fn get_returns_full_revision_or_none() {
    let conn = setup();
    let ledger = SqliteRevisionLedger::try_new(&conn).unwrap();
    let doc = Uuid::new_v4();

    let stored = ledger.snapshot(doc, "# Title", true, 5).unwrap();
    assert_eq!(ledger.get(stored.id).unwrap(), Some(stored));
    assert_eq!(ledger.get(Uuid::new_v4()).unwrap(), None);
}

#[test]
fn delete_for_documents_purges_only_named_documents() {
    let conn = setup();
    let ledger = SqliteRevisionLedger::try_new(&conn).unwrap();
    let doomed = Uuid::new_v4();
    let kept = Uuid::new_v4();

    ledger.snapshot(doomed, "A", true, 1).unwrap();
    ledger.snapshot(doomed, "B", true, 2).unwrap();
    ledger.snapshot(kept, "C", true, 3).unwrap();

    assert_eq!(ledger.delete_for_documents(&[doomed]).unwrap(), 2);
    assert!(ledger.list(doomed).unwrap().is_empty());
    assert_eq!(ledger.list(kept).unwrap().len(), 1);
    assert_eq!(ledger.delete_for_documents(&[]).unwrap(), 0);
}

#[test]
fn concurrent_version_collision_is_a_conflict() {
    let conn = setup();
    let ledger = SqliteRevisionLedger::try_new(&conn).unwrap();
    let doc = Uuid::new_v4();
    ledger.snapshot(doc, "A", true, 1).unwrap();

    install_racing_writer(&conn);
    let err = ledger.snapshot(doc, "B", true, 2).unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict { document_id, version } if document_id == doc && version == 2
    ));
    assert_eq!(ledger.latest_version(doc).unwrap(), 1);
}

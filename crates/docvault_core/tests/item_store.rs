use docvault_core::db::open_db_in_memory;
use docvault_core::{
    DocumentContent, ExternalRef, Item, ItemStore, SqliteItemStore, StoreError, ValidationError,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn inline(content: &str) -> DocumentContent {
    DocumentContent::Inline {
        content: content.to_string(),
        is_markdown: true,
    }
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteItemStore::try_new(&conn).err().unwrap();
    assert!(matches!(err, StoreError::UninitializedConnection { .. }));
}

#[test]
fn put_and_get_roundtrip_document_with_tags() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let category = Item::new_category("Guides", None);
    store.put(&category).unwrap();
    let tags = vec!["rust".to_string(), " Intro ".to_string(), "rust".to_string()];
    let document = Item::new_document("Intro", Some(category.id), &tags, inline("# Hello"));
    store.put(&document).unwrap();

    let loaded = store.get(document.id).unwrap().unwrap();
    assert_eq!(loaded, document);
    assert_eq!(
        loaded.as_document().unwrap().tags,
        vec!["Intro".to_string(), "rust".to_string()]
    );
    assert_eq!(loaded.inline_content(), Some(("# Hello", true)));
}

#[test]
fn put_roundtrips_external_blob_reference() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let document = Item::new_document(
        "scan.pdf",
        None,
        &[],
        DocumentContent::ExternalBlob {
            external_ref: ExternalRef {
                key: "k-1".to_string(),
                url: "memory://k-1".to_string(),
                original_name: "scan.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                size: 2048,
            },
        },
    );
    store.put(&document).unwrap();

    let loaded = store.get(document.id).unwrap().unwrap();
    assert_eq!(loaded.external_ref(), document.external_ref());
    assert_eq!(loaded.inline_content(), None);
}

#[test]
fn put_upserts_existing_row_and_replaces_tags() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let mut document = Item::new_document("Draft", None, &["a".to_string()], inline("v1"));
    store.put(&document).unwrap();

    document.name = "Final".to_string();
    document.as_document_mut().unwrap().tags = vec!["b".to_string()];
    store.put(&document).unwrap();

    let loaded = store.get(document.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Final");
    assert_eq!(loaded.as_document().unwrap().tags, vec!["b".to_string()]);
    assert_eq!(store.list_all().unwrap().len(), 1);
}

#[test]
fn put_rejects_invalid_items_before_writing() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let mut blank = Item::new_category("x", None);
    blank.name = "   ".to_string();
    let err = store.put(&blank).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::EmptyName)
    ));
    assert!(store.get(blank.id).unwrap().is_none());
}

#[test]
fn kind_and_storage_mode_are_immutable_in_storage() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let document = Item::new_document("Intro", None, &[], inline("A"));
    store.put(&document).unwrap();

    let kind_change = conn.execute(
        "UPDATE items SET kind = 'category', storage_mode = NULL, content = NULL, is_markdown = NULL WHERE id = ?1;",
        [document.id.to_string()],
    );
    assert!(kind_change.is_err());

    let mode_change = conn.execute(
        "UPDATE items SET storage_mode = 'external_blob', blob_key = 'k' WHERE id = ?1;",
        [document.id.to_string()],
    );
    assert!(mode_change.is_err());

    let replacement = Item {
        body: Item::new_category("Intro", None).body,
        ..document.clone()
    };
    assert!(store.put(&replacement).is_err());
    assert_eq!(store.get(document.id).unwrap().unwrap(), document);
}

#[test]
fn delete_reports_whether_row_existed_and_drops_tags() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let document = Item::new_document("Intro", None, &["t".to_string()], inline("A"));
    store.put(&document).unwrap();

    assert!(store.delete(document.id).unwrap());
    assert!(!store.delete(document.id).unwrap());
    assert!(store.get(document.id).unwrap().is_none());

    let tag_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM item_tags;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tag_rows, 0);
}

#[test]
fn list_subtree_collects_every_descendant() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let root = Item::new_category("Root", None);
    let child = Item::new_category("Child", Some(root.id));
    let grandchild = Item::new_document("Leaf", Some(child.id), &[], inline("x"));
    let sibling = Item::new_category("Sibling", None);
    for item in [&root, &child, &grandchild, &sibling] {
        store.put(item).unwrap();
    }

    let mut ids = store
        .list_subtree(root.id)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect::<Vec<_>>();
    ids.sort();
    let mut expected = vec![root.id, child.id, grandchild.id];
    expected.sort();
    assert_eq!(ids, expected);

    assert!(store.list_subtree(uuid::Uuid::new_v4()).unwrap().is_empty());
}

#[test]
fn list_subtree_terminates_on_corrupt_cycle() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    let a = Item::new_category("A", None);
    let b = Item::new_category("B", Some(a.id));
    store.put(&a).unwrap();
    store.put(&b).unwrap();
    conn.execute(
        "UPDATE items SET parent_id = ?1 WHERE id = ?2;",
        [b.id.to_string(), a.id.to_string()],
    )
    .unwrap();

    assert_eq!(store.list_subtree(a.id).unwrap().len(), 2);
}

#[test]
fn corrupt_rows_are_reported_as_invalid_data() {
    let conn = setup();
    let store = SqliteItemStore::try_new(&conn).unwrap();

    conn.execute(
        "INSERT INTO items (id, name, kind, created_at, updated_at)
         VALUES ('not-a-uuid', 'Broken', 'category', 0, 0);",
        [],
    )
    .unwrap();

    let err = store.list_all().unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

use docvault_core::db::open_db;
use docvault_core::{
    Item, ItemId, MemoryBlobStore, MutationCoordinator, NewDocumentContent, NewItem,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 4;
const EDITS_PER_WRITER: usize = 10;

fn seed_document(path: &Path) -> ItemId {
    let conn = open_db(path).unwrap();
    let coordinator = MutationCoordinator::try_new(&conn, MemoryBlobStore::new()).unwrap();
    coordinator
        .insert(
            None,
            NewItem::Document {
                name: "Shared".to_string(),
                tags: Vec::new(),
                content: NewDocumentContent::Inline {
                    content: "seed".to_string(),
                    is_markdown: true,
                },
            },
        )
        .unwrap()
        .id
}

fn spawn_writers<F>(path: &Path, work: F) -> Vec<thread::JoinHandle<()>>
where
    F: Fn(usize, &MutationCoordinator<'_, MemoryBlobStore>) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(WRITERS));
    (0..WRITERS)
        .map(|writer| {
            let path: PathBuf = path.to_path_buf();
            let work = Arc::clone(&work);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let coordinator =
                    MutationCoordinator::try_new(&conn, MemoryBlobStore::new()).unwrap();
                barrier.wait();
                work(writer, &coordinator);
            })
        })
        .collect()
}

#[test]
fn concurrent_content_updates_never_lose_or_duplicate_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.sqlite3");
    let doc_id = seed_document(&path);

    let handles = spawn_writers(&path, move |writer, coordinator| {
        for edit in 0..EDITS_PER_WRITER {
            coordinator
                .update_content(doc_id, &format!("w{writer}-e{edit}"), true, None)
                .unwrap();
        }
    });
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let coordinator = MutationCoordinator::try_new(&conn, MemoryBlobStore::new()).unwrap();
    let history = coordinator.list_revisions(doc_id).unwrap();
    let total = WRITERS * EDITS_PER_WRITER;
    assert_eq!(history.len(), total);

    let versions = history.iter().map(|meta| meta.version).collect::<Vec<_>>();
    let expected = (1..=total as u32).rev().collect::<Vec<_>>();
    assert_eq!(versions, expected);

    let mut archived = HashSet::new();
    for meta in &history {
        let revision = coordinator.get_revision(meta.id).unwrap();
        assert!(archived.insert(revision.content), "duplicate snapshot");
    }
    let live = coordinator.get_item(doc_id).unwrap();
    let (live_content, _) = live.inline_content().unwrap();
    assert!(!archived.contains(live_content));
    assert!(archived.contains("seed"));
}

#[test]
fn concurrent_cross_moves_cannot_form_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.sqlite3");

    let (a, b) = {
        let conn = open_db(&path).unwrap();
        let coordinator = MutationCoordinator::try_new(&conn, MemoryBlobStore::new()).unwrap();
        let create = |name: &str| -> Item {
            coordinator
                .insert(
                    None,
                    NewItem::Category {
                        name: name.to_string(),
                    },
                )
                .unwrap()
        };
        (create("A"), create("B"))
    };
    let (a_id, b_id) = (a.id, b.id);

    let handles = spawn_writers(&path, move |writer, coordinator| {
        let (item, parent) = if writer % 2 == 0 {
            (a_id, b_id)
        } else {
            (b_id, a_id)
        };
        let _ = coordinator.reparent(item, Some(parent));
    });
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let coordinator = MutationCoordinator::try_new(&conn, MemoryBlobStore::new()).unwrap();
    let a = coordinator.get_item(a_id).unwrap();
    let b = coordinator.get_item(b_id).unwrap();
    let cyclic = a.parent_id == Some(b_id) && b.parent_id == Some(a_id);
    assert!(!cyclic);
    assert!(a.parent_id == Some(b_id) || b.parent_id == Some(a_id));
    assert_eq!(coordinator.structure().unwrap().len(), 1);
}

//! Mutation coordinator for the category/document hierarchy.
//!
//! # Responsibility
//! - Expose every composite mutation (insert, rename, content edit, tag edit,
//!   reparent, cascading delete, revert) as one atomic unit.
//! - Expose read-side queries (item, structure, history, breadcrumbs, search).
//!
//! # Invariants
//! - Every mutation runs inside a single `BEGIN IMMEDIATE` transaction; either
//!   all of its store and ledger writes land or none do.
//! - Hierarchy preconditions (parent exists, parent is a category, no cycle)
//!   are evaluated inside the same transaction as the write they guard.
//! - Content edits and reverts snapshot the superseded content first.
//! - Blob uploads happen before the store write; a failed store write releases
//!   the uploaded blob.
//! - Blob releases during delete run after the delete commits and never undo
//!   it. The write lock is never held across blob I/O in a delete.

use crate::blob::{BlobAdapter, BlobError};
use crate::model::{
    normalize_name, normalize_tags, DocumentContent, Item, ItemId, Revision, RevisionId,
    RevisionMeta, StorageMode, ValidationError,
};
use crate::repo::{
    ensure_store_ready, ItemStore, RevisionLedger, SqliteItemStore, SqliteRevisionLedger,
};
use crate::search::fts::{search_documents, SearchHit, SearchQuery};
use crate::service::error::{CoordinatorError, CoordinatorResult};
use crate::tree::{build_forest, TreeNode};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::HashSet;

/// Upper bound on parent-chain walks. Moves under a deeper chain are refused.
pub const MAX_ANCESTOR_DEPTH: usize = 10_000;

/// Input for [`MutationCoordinator::insert`].
#[derive(Debug, Clone)]
pub enum NewItem {
    Category {
        name: String,
    },
    Document {
        name: String,
        tags: Vec<String>,
        content: NewDocumentContent,
    },
}

impl NewItem {
    fn name(&self) -> &str {
        match self {
            Self::Category { name } | Self::Document { name, .. } => name,
        }
    }
}

/// Content source for a new document.
#[derive(Debug, Clone)]
pub enum NewDocumentContent {
    /// Text stored in the item record.
    Inline { content: String, is_markdown: bool },
    /// Binary payload handed to the blob adapter.
    Upload {
        bytes: Vec<u8>,
        file_name: String,
        mime_type: String,
    },
}

impl NewDocumentContent {
    /// Empty inline markdown document.
    pub fn blank() -> Self {
        Self::Inline {
            content: String::new(),
            is_markdown: true,
        }
    }
}

/// Result of a content edit or revert.
#[derive(Debug, Clone)]
pub struct ContentChange {
    /// Document after the change.
    pub item: Item,
    /// Snapshot of the content that was replaced.
    pub archived: Revision,
}

/// Blob that could not be released during a cascading delete.
#[derive(Debug)]
pub struct BlobReleaseFailure {
    pub item_id: ItemId,
    pub key: String,
    pub error: BlobError,
}

/// Outcome of a cascading delete.
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Ids removed from the item store, target first.
    pub deleted_items: Vec<ItemId>,
    /// Number of revisions removed from the ledger.
    pub deleted_revisions: usize,
    /// Blob keys released successfully.
    pub released_blobs: Vec<String>,
    /// Blob keys whose release failed. The items were deleted regardless.
    pub blob_failures: Vec<BlobReleaseFailure>,
}

/// Coordinates item store, revision ledger and blob adapter.
pub struct MutationCoordinator<'conn, B: BlobAdapter> {
    conn: &'conn Connection,
    blobs: B,
}

impl<'conn, B: BlobAdapter> MutationCoordinator<'conn, B> {
    /// Creates a coordinator over a migrated connection.
    pub fn try_new(conn: &'conn Connection, blobs: B) -> CoordinatorResult<Self> {
        ensure_store_ready(conn)?;
        Ok(Self { conn, blobs })
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Creates a category or document under `parent_id` (root when `None`).
    ///
    /// Uploads are sent to the blob adapter before the store write.
    pub fn insert(&self, parent_id: Option<ItemId>, data: NewItem) -> CoordinatorResult<Item> {
        let name = normalize_name(data.name())?;

        let item = match data {
            NewItem::Category { .. } => Item::new_category(name, parent_id),
            NewItem::Document { tags, content, .. } => {
                let content = match content {
                    NewDocumentContent::Inline {
                        content,
                        is_markdown,
                    } => DocumentContent::Inline {
                        content,
                        is_markdown,
                    },
                    NewDocumentContent::Upload {
                        bytes,
                        file_name,
                        mime_type,
                    } => {
                        if file_name.trim().is_empty() {
                            return Err(ValidationError::MissingField("file_name").into());
                        }
                        if mime_type.trim().is_empty() {
                            return Err(ValidationError::MissingField("mime_type").into());
                        }
                        if let Some(parent_id) = parent_id {
                            self.read(|store, _| ensure_parent_is_category(store, parent_id))?;
                        }
                        let external_ref =
                            self.blobs
                                .upload(&bytes, file_name.trim(), mime_type.trim())?;
                        DocumentContent::ExternalBlob { external_ref }
                    }
                };
                Item::new_document(name, parent_id, &tags, content)
            }
        };

        let written = self.write(|store, _| {
            if let Some(parent_id) = item.parent_id {
                ensure_parent_is_category(store, parent_id)?;
            }
            store.put(&item)?;
            Ok(())
        });

        if let Err(err) = written {
            if let Some(external_ref) = item.external_ref() {
                if let Err(release_err) = self.blobs.delete(&external_ref.key) {
                    warn!(
                        "event=blob_release module=service status=error item_id={} key={} error={}",
                        item.id, external_ref.key, release_err
                    );
                }
            }
            return Err(err);
        }

        info!(
            "event=item_insert module=service status=ok item_id={} kind={:?} storage_mode={:?}",
            item.id,
            item.kind(),
            item.storage_mode()
        );
        Ok(item)
    }

    /// Renames any item. Location and content are unchanged.
    pub fn rename(&self, id: ItemId, new_name: &str) -> CoordinatorResult<Item> {
        let name = normalize_name(new_name)?;
        let item = self.write(|store, _| {
            let mut item = store.get(id)?.ok_or(CoordinatorError::ItemNotFound(id))?;
            item.name = name;
            item.touch();
            store.put(&item)?;
            Ok(item)
        })?;

        info!("event=item_rename module=service status=ok item_id={id}");
        Ok(item)
    }

    /// Replaces the inline content of a document, archiving the old content.
    ///
    /// `tags`, when given, replaces the document's tag set in the same write.
    pub fn update_content(
        &self,
        id: ItemId,
        content: &str,
        is_markdown: bool,
        tags: Option<Vec<String>>,
    ) -> CoordinatorResult<ContentChange> {
        let change = self.write(|store, ledger| {
            let mut item = load_inline_document(store, id)?;
            let archived = archive_current_content(ledger, &item)?;

            if let Some(document) = item.as_document_mut() {
                document.content = DocumentContent::Inline {
                    content: content.to_string(),
                    is_markdown,
                };
                if let Some(tags) = tags.as_deref() {
                    document.tags = normalize_tags(tags);
                }
            }
            item.touch();
            store.put(&item)?;
            Ok(ContentChange { item, archived })
        })?;

        info!(
            "event=document_update module=service status=ok item_id={id} archived_version={}",
            change.archived.version
        );
        Ok(change)
    }

    /// Replaces the tag set of a document of either storage mode.
    pub fn update_tags(&self, id: ItemId, tags: &[String]) -> CoordinatorResult<Item> {
        let item = self.write(|store, _| {
            let mut item = store
                .get(id)?
                .ok_or(CoordinatorError::DocumentNotFound(id))?;
            let document = item
                .as_document_mut()
                .ok_or(CoordinatorError::DocumentNotFound(id))?;
            document.tags = normalize_tags(tags);
            item.touch();
            store.put(&item)?;
            Ok(item)
        })?;

        info!("event=document_tags module=service status=ok item_id={id}");
        Ok(item)
    }

    /// Moves an item under `new_parent_id`, or to root when `None`.
    pub fn reparent(&self, id: ItemId, new_parent_id: Option<ItemId>) -> CoordinatorResult<Item> {
        let item = self.write(|store, _| {
            let mut item = store.get(id)?.ok_or(CoordinatorError::ItemNotFound(id))?;

            if let Some(parent_id) = new_parent_id {
                if parent_id == id {
                    return Err(CoordinatorError::CycleDetected {
                        item_id: id,
                        parent_id,
                    });
                }
                ensure_parent_is_category(store, parent_id)?;
                match walk_ancestors(store, id, parent_id)? {
                    AncestorWalk::Clear => {}
                    AncestorWalk::Cycle => {
                        return Err(CoordinatorError::CycleDetected {
                            item_id: id,
                            parent_id,
                        });
                    }
                    AncestorWalk::TooDeep => {
                        return Err(CoordinatorError::AncestorChainTooDeep {
                            parent_id,
                            limit: MAX_ANCESTOR_DEPTH,
                        });
                    }
                }
            }

            item.parent_id = new_parent_id;
            item.touch();
            store.put(&item)?;
            Ok(item)
        })?;

        info!(
            "event=item_move module=service status=ok item_id={id} parent_id={}",
            display_parent(new_parent_id)
        );
        Ok(item)
    }

    /// Deletes an item. Categories take their whole subtree with them.
    ///
    /// Revisions of every removed document are purged in the same write. Blobs
    /// are released only after that write commits, so a failed delete never
    /// leaves an item pointing at a released blob. Releases are best-effort and
    /// reported in [`DeleteReport::blob_failures`].
    pub fn delete(&self, id: ItemId) -> CoordinatorResult<DeleteReport> {
        let (mut report, external_refs) = self.write(|store, ledger| {
            let target = store.get(id)?.ok_or(CoordinatorError::ItemNotFound(id))?;
            let mut doomed = if target.is_category() {
                store.list_subtree(id)?
            } else {
                Vec::new()
            };
            doomed.retain(|item| item.id != id);
            doomed.insert(0, target);

            let mut report = DeleteReport::default();
            for item in &doomed {
                store.delete(item.id)?;
                report.deleted_items.push(item.id);
            }

            let document_ids = doomed
                .iter()
                .filter(|item| !item.is_category())
                .map(|item| item.id)
                .collect::<Vec<_>>();
            report.deleted_revisions = ledger.delete_for_documents(&document_ids)?;

            let external_refs = doomed
                .iter()
                .filter_map(|item| Some((item.id, item.external_ref()?.key.clone())))
                .collect::<Vec<_>>();
            Ok((report, external_refs))
        })?;

        for (item_id, key) in external_refs {
            match self.blobs.delete(&key) {
                Ok(()) => report.released_blobs.push(key),
                Err(err) => {
                    warn!(
                        "event=blob_release module=service status=error item_id={item_id} key={key} error={err}"
                    );
                    report.blob_failures.push(BlobReleaseFailure {
                        item_id,
                        key,
                        error: err,
                    });
                }
            }
        }

        info!(
            "event=item_delete module=service status=ok item_id={id} items={} revisions={} blob_failures={}",
            report.deleted_items.len(),
            report.deleted_revisions,
            report.blob_failures.len()
        );
        Ok(report)
    }

    /// Restores a document's content from one of its revisions.
    ///
    /// The content being replaced is archived first, so a revert is itself
    /// revertible.
    pub fn revert(
        &self,
        document_id: ItemId,
        revision_id: RevisionId,
    ) -> CoordinatorResult<ContentChange> {
        let change = self.write(|store, ledger| {
            let mut item = load_inline_document(store, document_id)?;
            let target = ledger
                .get(revision_id)?
                .ok_or(CoordinatorError::RevisionNotFound(revision_id))?;
            if target.document_id != document_id {
                return Err(CoordinatorError::RevisionMismatch {
                    revision_id,
                    document_id,
                });
            }

            let archived = archive_current_content(ledger, &item)?;
            if let Some(document) = item.as_document_mut() {
                document.content = DocumentContent::Inline {
                    content: target.content,
                    is_markdown: target.is_markdown,
                };
            }
            item.touch();
            store.put(&item)?;
            Ok(ContentChange { item, archived })
        })?;

        info!(
            "event=document_revert module=service status=ok item_id={document_id} revision_id={revision_id} archived_version={}",
            change.archived.version
        );
        Ok(change)
    }

    /// Loads one item.
    pub fn get_item(&self, id: ItemId) -> CoordinatorResult<Item> {
        self.read(|store, _| store.get(id)?.ok_or(CoordinatorError::ItemNotFound(id)))
    }

    /// Builds the full nested forest from one consistent read.
    pub fn structure(&self) -> CoordinatorResult<Vec<TreeNode>> {
        let items = self.read(|store, _| Ok(store.list_all()?))?;
        Ok(build_forest(&items))
    }

    /// Lists revision metadata for a document, newest first.
    pub fn list_revisions(&self, document_id: ItemId) -> CoordinatorResult<Vec<RevisionMeta>> {
        self.read(|store, ledger| {
            let item = store
                .get(document_id)?
                .ok_or(CoordinatorError::DocumentNotFound(document_id))?;
            if item.is_category() {
                return Err(CoordinatorError::DocumentNotFound(document_id));
            }
            Ok(ledger.list(document_id)?)
        })
    }

    /// Loads one revision including its content.
    pub fn get_revision(&self, revision_id: RevisionId) -> CoordinatorResult<Revision> {
        self.read(|_, ledger| {
            ledger
                .get(revision_id)?
                .ok_or(CoordinatorError::RevisionNotFound(revision_id))
        })
    }

    /// Returns the chain from the outermost reachable ancestor down to `id`.
    ///
    /// The walk stops at a missing parent or a repeated id.
    pub fn ancestor_path(&self, id: ItemId) -> CoordinatorResult<Vec<Item>> {
        self.read(|store, _| {
            let item = store.get(id)?.ok_or(CoordinatorError::ItemNotFound(id))?;
            let mut visited = HashSet::from([item.id]);
            let mut cursor = item.parent_id;
            let mut path = vec![item];
            while let Some(current) = cursor {
                if path.len() >= MAX_ANCESTOR_DEPTH || !visited.insert(current) {
                    break;
                }
                let Some(parent) = store.get(current)? else {
                    break;
                };
                cursor = parent.parent_id;
                path.push(parent);
            }
            path.reverse();
            Ok(path)
        })
    }

    /// Full-text search over inline documents.
    pub fn search(&self, query: &SearchQuery) -> CoordinatorResult<Vec<SearchHit>> {
        Ok(search_documents(self.conn, query)?)
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&dyn ItemStore, &dyn RevisionLedger) -> CoordinatorResult<T>,
    ) -> CoordinatorResult<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = {
            let store = SqliteItemStore::bind(&tx);
            let ledger = SqliteRevisionLedger::bind(&tx);
            op(&store, &ledger)?
        };
        tx.commit()?;
        Ok(value)
    }

    /// Runs `op` without a transaction. Reads never take the write lock.
    fn read<T>(
        &self,
        op: impl FnOnce(&dyn ItemStore, &dyn RevisionLedger) -> CoordinatorResult<T>,
    ) -> CoordinatorResult<T> {
        let store = SqliteItemStore::bind(self.conn);
        let ledger = SqliteRevisionLedger::bind(self.conn);
        op(&store, &ledger)
    }
}

fn ensure_parent_is_category(store: &dyn ItemStore, parent_id: ItemId) -> CoordinatorResult<()> {
    let parent = store
        .get(parent_id)?
        .ok_or(CoordinatorError::ParentNotFound(parent_id))?;
    if !parent.is_category() {
        return Err(CoordinatorError::ParentMustBeCategory(parent_id));
    }
    Ok(())
}

enum AncestorWalk {
    Clear,
    /// The chain reaches the moved item or revisits a node.
    Cycle,
    /// The chain is longer than [`MAX_ANCESTOR_DEPTH`].
    TooDeep,
}

/// Walks up from `candidate_parent_id` looking for `item_id`.
fn walk_ancestors(
    store: &dyn ItemStore,
    item_id: ItemId,
    candidate_parent_id: ItemId,
) -> CoordinatorResult<AncestorWalk> {
    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent_id);
    while let Some(current) = cursor {
        if current == item_id || !visited.insert(current) {
            return Ok(AncestorWalk::Cycle);
        }
        if visited.len() > MAX_ANCESTOR_DEPTH {
            return Ok(AncestorWalk::TooDeep);
        }
        cursor = match store.get(current)? {
            Some(node) => node.parent_id,
            None => None,
        };
    }
    Ok(AncestorWalk::Clear)
}

fn load_inline_document(store: &dyn ItemStore, id: ItemId) -> CoordinatorResult<Item> {
    let item = store
        .get(id)?
        .ok_or(CoordinatorError::DocumentNotFound(id))?;
    match item.storage_mode() {
        None => Err(CoordinatorError::DocumentNotFound(id)),
        Some(StorageMode::ExternalBlob) => Err(CoordinatorError::ExternalBlobDocument(id)),
        Some(StorageMode::Inline) => Ok(item),
    }
}

fn archive_current_content(ledger: &dyn RevisionLedger, item: &Item) -> CoordinatorResult<Revision> {
    let (content, is_markdown) = item
        .inline_content()
        .ok_or(CoordinatorError::ExternalBlobDocument(item.id))?;
    Ok(ledger.snapshot(item.id, content, is_markdown, item.updated_at)?)
}

fn display_parent(parent_id: Option<ItemId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}

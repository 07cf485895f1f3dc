//! Item store contract and SQLite implementation.
//!
//! # Responsibility
//! - Flat, id-indexed storage of categories and documents.
//! - Persist document tags alongside the owning item.
//!
//! # Invariants
//! - `put` is an upsert keyed by `id`; `kind` and `storage_mode` of an
//!   existing row are guarded by triggers and cannot change.
//! - `list_subtree` reads through one recursive query, so the closure it
//!   returns is consistent with the surrounding transaction.

use crate::model::{
    Document, DocumentContent, ExternalRef, Item, ItemBody, ItemId, ItemKind, StorageMode,
};
use crate::repo::{bool_to_int, ensure_store_ready, parse_bool, parse_uuid};
use crate::repo::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    name,
    kind,
    parent_id,
    storage_mode,
    content,
    is_markdown,
    blob_key,
    blob_url,
    blob_size,
    blob_mime_type,
    blob_original_name,
    created_at,
    updated_at
FROM items";

/// Repository interface for the flat item collection.
pub trait ItemStore {
    /// Loads one item by id.
    fn get(&self, id: ItemId) -> StoreResult<Option<Item>>;
    /// Inserts or replaces one item, including its tag set.
    fn put(&self, item: &Item) -> StoreResult<()>;
    /// Removes one item. Returns whether a row existed.
    fn delete(&self, id: ItemId) -> StoreResult<bool>;
    /// Loads every item. Order is unspecified.
    fn list_all(&self) -> StoreResult<Vec<Item>>;
    /// Loads `root` and every item whose parent chain leads back to it.
    ///
    /// Returns an empty list when `root` does not exist.
    fn list_subtree(&self, root: ItemId) -> StoreResult<Vec<Item>>;
}

/// SQLite-backed item store.
pub struct SqliteItemStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_ready(conn)?;
        Ok(Self { conn })
    }

    /// Binds to a connection or transaction already checked by the caller.
    pub(crate) fn bind(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ItemStore for SqliteItemStore<'_> {
    fn get(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let tags = load_tags(self.conn, id)?;
            return Ok(Some(parse_item_row(row, tags)?));
        }
        Ok(None)
    }

    fn put(&self, item: &Item) -> StoreResult<()> {
        item.validate()?;

        let (storage_mode, content, is_markdown, blob) = match &item.body {
            ItemBody::Category => (None, None, None, None),
            ItemBody::Document(document) => match &document.content {
                DocumentContent::Inline {
                    content,
                    is_markdown,
                } => (
                    Some(StorageMode::Inline),
                    Some(content.as_str()),
                    Some(bool_to_int(*is_markdown)),
                    None,
                ),
                DocumentContent::ExternalBlob { external_ref } => {
                    (Some(StorageMode::ExternalBlob), None, None, Some(external_ref))
                }
            },
        };
        let blob_size = blob
            .map(|blob| i64::try_from(blob.size))
            .transpose()
            .map_err(|_| StoreError::InvalidData(format!("blob too large for item {}", item.id)))?;

        self.conn.execute(
            "INSERT INTO items (
                id,
                name,
                kind,
                parent_id,
                storage_mode,
                content,
                is_markdown,
                blob_key,
                blob_url,
                blob_size,
                blob_mime_type,
                blob_original_name,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                parent_id = excluded.parent_id,
                storage_mode = excluded.storage_mode,
                content = excluded.content,
                is_markdown = excluded.is_markdown,
                blob_key = excluded.blob_key,
                blob_url = excluded.blob_url,
                blob_size = excluded.blob_size,
                blob_mime_type = excluded.blob_mime_type,
                blob_original_name = excluded.blob_original_name,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at;",
            params![
                item.id.to_string(),
                item.name.as_str(),
                kind_to_db(item.kind()),
                item.parent_id.map(|value| value.to_string()),
                storage_mode.map(storage_mode_to_db),
                content,
                is_markdown,
                blob.map(|blob| blob.key.as_str()),
                blob.map(|blob| blob.url.as_str()),
                blob_size,
                blob.map(|blob| blob.mime_type.as_str()),
                blob.map(|blob| blob.original_name.as_str()),
                item.created_at,
                item.updated_at,
            ],
        )?;

        self.conn.execute(
            "DELETE FROM item_tags WHERE item_id = ?1;",
            [item.id.to_string()],
        )?;
        if let Some(document) = item.as_document() {
            for tag in &document.tags {
                self.conn.execute(
                    "INSERT INTO item_tags (item_id, tag) VALUES (?1, ?2);",
                    params![item.id.to_string(), tag.as_str()],
                )?;
            }
        }

        Ok(())
    }

    fn delete(&self, id: ItemId) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn list_all(&self) -> StoreResult<Vec<Item>> {
        let mut tags_by_item = load_all_tags(self.conn)?;
        let mut stmt = self.conn.prepare(&format!("{ITEM_SELECT_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let id = parse_uuid(&id_text, "items.id")?;
            let tags = tags_by_item.remove(&id).unwrap_or_default();
            items.push(parse_item_row(row, tags)?);
        }
        Ok(items)
    }

    fn list_subtree(&self, root: ItemId) -> StoreResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id
                FROM items
                WHERE id = ?1
                UNION
                SELECT child.id
                FROM items child
                INNER JOIN subtree parent ON child.parent_id = parent.id
            )
            {ITEM_SELECT_SQL}
            WHERE id IN (SELECT id FROM subtree);"
        ))?;
        let mut rows = stmt.query([root.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let id = parse_uuid(&id_text, "items.id")?;
            let tags = load_tags(self.conn, id)?;
            items.push(parse_item_row(row, tags)?);
        }
        Ok(items)
    }
}

fn load_tags(conn: &Connection, id: ItemId) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM item_tags
         WHERE item_id = ?1
         ORDER BY tag ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

fn load_all_tags(conn: &Connection) -> StoreResult<HashMap<ItemId, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT item_id, tag
         FROM item_tags
         ORDER BY item_id ASC, tag ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut tags_by_item: HashMap<ItemId, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        let id = parse_uuid(&id_text, "item_tags.item_id")?;
        tags_by_item.entry(id).or_default().push(row.get(1)?);
    }
    Ok(tags_by_item)
}

fn parse_item_row(row: &Row<'_>, tags: Vec<String>) -> StoreResult<Item> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "items.id")?;

    let parent_id = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "items.parent_id"))
        .transpose()?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_kind(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid item kind `{kind_text}` in items.kind"))
    })?;

    let body = match kind {
        ItemKind::Category => ItemBody::Category,
        ItemKind::Document => ItemBody::Document(Document {
            tags,
            content: parse_document_content(row, id)?,
        }),
    };

    let item = Item {
        id,
        name: row.get("name")?,
        parent_id,
        body,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    item.validate()
        .map_err(|err| StoreError::InvalidData(format!("item {id}: {err}")))?;
    Ok(item)
}

fn parse_document_content(row: &Row<'_>, id: ItemId) -> StoreResult<DocumentContent> {
    let mode_text: Option<String> = row.get("storage_mode")?;
    let mode = mode_text.as_deref().and_then(parse_storage_mode).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid storage mode `{}` for document {id}",
            mode_text.as_deref().unwrap_or("NULL")
        ))
    })?;

    match mode {
        StorageMode::Inline => {
            let content: Option<String> = row.get("content")?;
            let is_markdown: Option<i64> = row.get("is_markdown")?;
            match (content, is_markdown) {
                (Some(content), Some(is_markdown)) => Ok(DocumentContent::Inline {
                    content,
                    is_markdown: parse_bool(is_markdown, "items.is_markdown")?,
                }),
                _ => Err(StoreError::InvalidData(format!(
                    "inline document {id} is missing content"
                ))),
            }
        }
        StorageMode::ExternalBlob => {
            let key: Option<String> = row.get("blob_key")?;
            let key = key.ok_or_else(|| {
                StoreError::InvalidData(format!("external document {id} is missing blob_key"))
            })?;
            let size: Option<i64> = row.get("blob_size")?;
            let size = u64::try_from(size.unwrap_or(0)).map_err(|_| {
                StoreError::InvalidData(format!("negative blob_size for document {id}"))
            })?;
            Ok(DocumentContent::ExternalBlob {
                external_ref: ExternalRef {
                    key,
                    url: row.get::<_, Option<String>>("blob_url")?.unwrap_or_default(),
                    original_name: row
                        .get::<_, Option<String>>("blob_original_name")?
                        .unwrap_or_default(),
                    mime_type: row
                        .get::<_, Option<String>>("blob_mime_type")?
                        .unwrap_or_default(),
                    size,
                },
            })
        }
    }
}

fn kind_to_db(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Category => "category",
        ItemKind::Document => "document",
    }
}

fn parse_kind(value: &str) -> Option<ItemKind> {
    match value {
        "category" => Some(ItemKind::Category),
        "document" => Some(ItemKind::Document),
        _ => None,
    }
}

fn storage_mode_to_db(mode: StorageMode) -> &'static str {
    match mode {
        StorageMode::Inline => "inline",
        StorageMode::ExternalBlob => "external_blob",
    }
}

fn parse_storage_mode(value: &str) -> Option<StorageMode> {
    match value {
        "inline" => Some(StorageMode::Inline),
        "external_blob" => Some(StorageMode::ExternalBlob),
        _ => None,
    }
}

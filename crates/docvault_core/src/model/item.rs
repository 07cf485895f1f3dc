//! Item domain model.
//!
//! # Responsibility
//! - Define the canonical record for categories and documents.
//! - Keep document storage (inline vs external blob) fixed for life.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `kind` never changes after creation.
//! - Inline documents always carry content; external-blob documents never do.
//! - `tags` are always normalized (trimmed, non-empty, sorted, unique).

use crate::model::validation::{normalize_tags, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every item in the hierarchy.
pub type ItemId = Uuid;

/// Item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Grouping node that may contain children.
    Category,
    /// Leaf node holding content.
    Document,
}

/// Where a document's content lives. Chosen once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Inline,
    ExternalBlob,
}

/// Opaque handle to binary content held by a blob adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    /// Adapter-specific key used for deletion.
    pub key: String,
    /// Address the blob can be fetched from.
    pub url: String,
    /// File name supplied at upload time.
    pub original_name: String,
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Document payload. The variant is the document's storage mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "storage_mode", rename_all = "snake_case")]
pub enum DocumentContent {
    Inline { content: String, is_markdown: bool },
    ExternalBlob { external_ref: ExternalRef },
}

impl DocumentContent {
    pub fn storage_mode(&self) -> StorageMode {
        match self {
            Self::Inline { .. } => StorageMode::Inline,
            Self::ExternalBlob { .. } => StorageMode::ExternalBlob,
        }
    }
}

/// Document-only state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub content: DocumentContent,
}

/// Kind-specific part of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    Category,
    Document(Document),
}

/// Canonical record for one node of the hierarchy.
///
/// The parent is a weak reference: the item store owns every item, and a
/// category does not own its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// `None` means root-level item.
    pub parent_id: Option<ItemId>,
    #[serde(flatten)]
    pub body: ItemBody,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on every mutation.
    pub updated_at: i64,
}

impl Item {
    /// Creates a category with a generated id and `created_at = updated_at = now`.
    pub fn new_category(name: impl Into<String>, parent_id: Option<ItemId>) -> Self {
        Self::with_body(name, parent_id, ItemBody::Category)
    }

    /// Creates a document with a generated id. Tags are normalized here.
    pub fn new_document(
        name: impl Into<String>,
        parent_id: Option<ItemId>,
        tags: &[String],
        content: DocumentContent,
    ) -> Self {
        Self::with_body(
            name,
            parent_id,
            ItemBody::Document(Document {
                tags: normalize_tags(tags),
                content,
            }),
        )
    }

    fn with_body(name: impl Into<String>, parent_id: Option<ItemId>, body: ItemBody) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id,
            body,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Category => ItemKind::Category,
            ItemBody::Document(_) => ItemKind::Document,
        }
    }

    pub fn is_category(&self) -> bool {
        self.kind() == ItemKind::Category
    }

    pub fn as_document(&self) -> Option<&Document> {
        match &self.body {
            ItemBody::Document(document) => Some(document),
            ItemBody::Category => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match &mut self.body {
            ItemBody::Document(document) => Some(document),
            ItemBody::Category => None,
        }
    }

    /// Storage mode for documents, `None` for categories.
    pub fn storage_mode(&self) -> Option<StorageMode> {
        self.as_document()
            .map(|document| document.content.storage_mode())
    }

    /// Live inline content as `(content, is_markdown)`.
    pub fn inline_content(&self) -> Option<(&str, bool)> {
        match self.as_document().map(|document| &document.content) {
            Some(DocumentContent::Inline {
                content,
                is_markdown,
            }) => Some((content.as_str(), *is_markdown)),
            _ => None,
        }
    }

    pub fn external_ref(&self) -> Option<&ExternalRef> {
        match self.as_document().map(|document| &document.content) {
            Some(DocumentContent::ExternalBlob { external_ref }) => Some(external_ref),
            _ => None,
        }
    }

    /// Refreshes `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = now_epoch_ms().max(self.updated_at);
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.parent_id == Some(self.id) {
            return Err(ValidationError::SelfParent(self.id));
        }
        if let Some(document) = self.as_document() {
            if normalize_tags(&document.tags) != document.tags {
                return Err(ValidationError::UnnormalizedTags(self.id));
            }
        }
        Ok(())
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{DocumentContent, Item, ItemKind, StorageMode};
    use crate::model::validation::ValidationError;

    #[test]
    fn new_document_normalizes_tags_and_reports_storage_mode() {
        let item = Item::new_document(
            "Intro",
            None,
            &[" b ".to_string(), "a".to_string(), "".to_string(), "b".to_string()],
            DocumentContent::Inline {
                content: "A".to_string(),
                is_markdown: true,
            },
        );

        assert_eq!(item.kind(), ItemKind::Document);
        assert_eq!(item.storage_mode(), Some(StorageMode::Inline));
        assert_eq!(item.inline_content(), Some(("A", true)));
        assert_eq!(
            item.as_document().unwrap().tags,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn validate_rejects_blank_name_and_self_parent() {
        let mut item = Item::new_category("   ", None);
        assert!(matches!(item.validate(), Err(ValidationError::EmptyName)));

        item.name = "Guides".to_string();
        item.parent_id = Some(item.id);
        assert!(matches!(
            item.validate(),
            Err(ValidationError::SelfParent(id)) if id == item.id
        ));
    }

    #[test]
    fn touch_never_moves_updated_at_backwards() {
        let mut item = Item::new_category("Guides", None);
        item.updated_at = i64::MAX - 1;
        item.touch();
        assert_eq!(item.updated_at, i64::MAX - 1);
    }

    #[test]
    fn category_has_no_storage_mode() {
        let item = Item::new_category("Guides", None);
        assert!(item.is_category());
        assert_eq!(item.storage_mode(), None);
        assert!(item.inline_content().is_none());
        assert!(item.external_ref().is_none());
    }
}

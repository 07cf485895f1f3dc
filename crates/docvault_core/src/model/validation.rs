//! Input normalization and identifier validation.
//!
//! All checks here run before any store access.

use crate::model::item::ItemId;
use crate::model::revision::RevisionId;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Malformed input rejected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is blank after trim.
    EmptyName,
    /// Identifier text is not a valid UUID.
    MalformedId { field: &'static str, value: String },
    /// Item names itself as its parent.
    SelfParent(ItemId),
    /// Required field is missing or blank.
    MissingField(&'static str),
    /// Document tags were not normalized before persistence.
    UnnormalizedTags(ItemId),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be blank"),
            Self::MalformedId { field, value } => {
                write!(f, "malformed {field}: `{value}` is not a valid id")
            }
            Self::SelfParent(id) => write!(f, "item cannot be its own parent: {id}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::UnnormalizedTags(id) => write!(f, "tags are not normalized for item {id}"),
        }
    }
}

impl Error for ValidationError {}

/// Trims a display name, rejecting blank values.
pub fn normalize_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Trims tags, drops empty entries and deduplicates. Output is sorted.
///
/// Case is preserved: `Rust` and `rust` are distinct tags.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Parses an item id from request text.
pub fn parse_item_id(value: &str) -> Result<ItemId, ValidationError> {
    parse_uuid("item id", value)
}

/// Parses a revision id from request text.
pub fn parse_revision_id(value: &str) -> Result<RevisionId, ValidationError> {
    parse_uuid("revision id", value)
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::MalformedId {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, normalize_tags, parse_item_id, ValidationError};

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  Guides ").unwrap(), "Guides");
        assert_eq!(normalize_name(" \t "), Err(ValidationError::EmptyName));
    }

    #[test]
    fn normalize_tags_trims_drops_empty_and_dedupes() {
        let tags = vec![
            " rust ".to_string(),
            String::new(),
            "   ".to_string(),
            "Rust".to_string(),
            "rust".to_string(),
        ];
        assert_eq!(
            normalize_tags(&tags),
            vec!["Rust".to_string(), "rust".to_string()]
        );
    }

    #[test]
    fn parse_item_id_rejects_malformed_text() {
        let err = parse_item_id("not-an-id").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedId { field: "item id", ref value } if value == "not-an-id"
        ));

        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_item_id(&format!(" {id} ")).unwrap(), id);
    }
}

//! Subcommand dispatch and JSON output.

use crate::cli::{AddDocumentArgs, Command, EditArgs};
use crate::config::CliConfig;
use docvault_core::{
    open_db, parse_item_id, parse_revision_id, BlobError, ContentChange, CoordinatorError,
    DbError, DeleteReport, ErrorKind, FsBlobStore, Item, ItemId, LoggingError,
    MutationCoordinator, NewDocumentContent, NewItem, RevisionMeta, SearchQuery,
    ValidationError,
};
use log::debug;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// CLI failure with an exit code per error kind.
#[derive(Debug)]
pub enum CliError {
    Coordinator(CoordinatorError),
    Db(DbError),
    Blob(BlobError),
    Logging(LoggingError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Output(serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Coordinator(err) => match err.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Conflict => 4,
                ErrorKind::UnsupportedOperation => 5,
                ErrorKind::StorageBackend => 6,
                ErrorKind::Internal => 1,
            },
            Self::Io { .. } => 2,
            Self::Blob(_) => 6,
            Self::Db(_) | Self::Logging(_) | Self::Output(_) => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coordinator(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Blob(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
            Self::Output(err) => write!(f, "failed to encode output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Coordinator(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Blob(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<CoordinatorError> for CliError {
    fn from(value: CoordinatorError) -> Self {
        Self::Coordinator(value)
    }
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        Self::Coordinator(CoordinatorError::Validation(value))
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<BlobError> for CliError {
    fn from(value: BlobError) -> Self {
        Self::Blob(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

#[derive(Serialize)]
struct ContentChangeOutput {
    item: Item,
    archived: RevisionMeta,
}

impl From<ContentChange> for ContentChangeOutput {
    fn from(value: ContentChange) -> Self {
        Self {
            archived: value.archived.meta(),
            item: value.item,
        }
    }
}

#[derive(Serialize)]
struct BlobFailureOutput {
    item_id: ItemId,
    key: String,
    error: String,
}

#[derive(Serialize)]
struct DeleteOutput {
    deleted_items: Vec<ItemId>,
    deleted_revisions: usize,
    released_blobs: Vec<String>,
    blob_failures: Vec<BlobFailureOutput>,
}

impl From<DeleteReport> for DeleteOutput {
    fn from(value: DeleteReport) -> Self {
        Self {
            deleted_items: value.deleted_items,
            deleted_revisions: value.deleted_revisions,
            released_blobs: value.released_blobs,
            blob_failures: value
                .blob_failures
                .into_iter()
                .map(|failure| BlobFailureOutput {
                    item_id: failure.item_id,
                    key: failure.key,
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

/// How a file given to `add-document` is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStorage {
    Inline { is_markdown: bool },
    Upload { mime_type: &'static str },
}

/// Markdown and HTML stay inline; everything else becomes a blob.
pub fn classify_file(path: &Path) -> FileStorage {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "md" | "markdown" => FileStorage::Inline { is_markdown: true },
        "html" | "htm" => FileStorage::Inline { is_markdown: false },
        other => FileStorage::Upload {
            mime_type: mime_for_extension(other),
        },
    }
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Opens the vault and runs one subcommand, printing its result as JSON.
pub fn run(command: Command, config: &CliConfig) -> Result<(), CliError> {
    let conn = open_db(&config.db_path)?;
    let blobs = FsBlobStore::open(&config.blob_dir)?;
    let coordinator = MutationCoordinator::try_new(&conn, blobs)?;

    match command {
        Command::Tree => print_json(&coordinator.structure()?),
        Command::Get { id } => print_json(&coordinator.get_item(parse_item_id(&id)?)?),
        Command::AddCategory { name, parent } => {
            let parent_id = parse_parent(parent.as_deref())?;
            print_json(&coordinator.insert(parent_id, NewItem::Category { name })?)
        }
        Command::AddDocument(args) => add_document(&coordinator, args),
        Command::Rename { id, name } => {
            print_json(&coordinator.rename(parse_item_id(&id)?, &name)?)
        }
        Command::Edit(args) => edit_document(&coordinator, args),
        Command::Tags { id, tags } => {
            print_json(&coordinator.update_tags(parse_item_id(&id)?, &tags)?)
        }
        Command::Move { id, parent } => {
            let id = parse_item_id(&id)?;
            let parent_id = parse_parent(parent.as_deref())?;
            print_json(&coordinator.reparent(id, parent_id)?)
        }
        Command::Delete { id } => {
            let report = coordinator.delete(parse_item_id(&id)?)?;
            print_json(&DeleteOutput::from(report))
        }
        Command::History { id } => {
            print_json(&coordinator.list_revisions(parse_item_id(&id)?)?)
        }
        Command::ShowRevision { revision_id } => {
            print_json(&coordinator.get_revision(parse_revision_id(&revision_id)?)?)
        }
        Command::Revert { id, revision_id } => {
            let id = parse_item_id(&id)?;
            let revision_id = parse_revision_id(&revision_id)?;
            print_json(&ContentChangeOutput::from(
                coordinator.revert(id, revision_id)?,
            ))
        }
        Command::Search { query, limit } => {
            let query = SearchQuery {
                text: query,
                limit,
            };
            print_json(&coordinator.search(&query)?)
        }
        Command::Path { id } => print_json(&coordinator.ancestor_path(parse_item_id(&id)?)?),
    }
}

fn add_document(
    coordinator: &MutationCoordinator<'_, FsBlobStore>,
    args: AddDocumentArgs,
) -> Result<(), CliError> {
    let parent_id = parse_parent(args.parent.as_deref())?;
    let content = match (args.file, args.content) {
        (Some(path), _) => match classify_file(&path) {
            FileStorage::Inline { is_markdown } => NewDocumentContent::Inline {
                content: read_text(&path)?,
                is_markdown: is_markdown && !args.html,
            },
            FileStorage::Upload { mime_type } => NewDocumentContent::Upload {
                bytes: std::fs::read(&path).map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?,
                file_name: file_name_of(&path),
                mime_type: mime_type.to_string(),
            },
        },
        (None, Some(content)) => NewDocumentContent::Inline {
            content,
            is_markdown: !args.html,
        },
        (None, None) => NewDocumentContent::blank(),
    };

    debug!("event=cli_add_document module=cli status=start");
    let item = coordinator.insert(
        parent_id,
        NewItem::Document {
            name: args.name,
            tags: args.tags,
            content,
        },
    )?;
    print_json(&item)
}

fn edit_document(
    coordinator: &MutationCoordinator<'_, FsBlobStore>,
    args: EditArgs,
) -> Result<(), CliError> {
    let id = parse_item_id(&args.id)?;
    let (content, is_markdown) = match (args.content, args.file) {
        (Some(content), _) => (content, !args.html),
        (None, Some(path)) => {
            let is_markdown = match classify_file(&path) {
                FileStorage::Inline { is_markdown } => is_markdown,
                FileStorage::Upload { .. } => true,
            };
            (read_text(&path)?, is_markdown && !args.html)
        }
        (None, None) => return Err(ValidationError::MissingField("content").into()),
    };

    let change = coordinator.update_content(id, &content, is_markdown, args.tags)?;
    print_json(&ContentChangeOutput::from(change))
}

fn parse_parent(parent: Option<&str>) -> Result<Option<ItemId>, CliError> {
    Ok(parent.map(parse_item_id).transpose()?)
}

fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{classify_file, CliError, FileStorage};
    use docvault_core::{CoordinatorError, ItemId, ValidationError};
    use std::path::Path;

    #[test]
    fn markdown_and_html_files_stay_inline() {
        assert_eq!(
            classify_file(Path::new("notes/Intro.MD")),
            FileStorage::Inline { is_markdown: true }
        );
        assert_eq!(
            classify_file(Path::new("page.htm")),
            FileStorage::Inline { is_markdown: false }
        );
    }

    #[test]
    fn other_files_are_uploaded_with_mime_type() {
        assert_eq!(
            classify_file(Path::new("scan.pdf")),
            FileStorage::Upload {
                mime_type: "application/pdf"
            }
        );
        assert_eq!(
            classify_file(Path::new("archive")),
            FileStorage::Upload {
                mime_type: "application/octet-stream"
            }
        );
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let validation: CliError = ValidationError::EmptyName.into();
        assert_eq!(validation.exit_code(), 2);

        let missing = CliError::Coordinator(CoordinatorError::ItemNotFound(ItemId::nil()));
        assert_eq!(missing.exit_code(), 3);

        let cycle = CliError::Coordinator(CoordinatorError::CycleDetected {
            item_id: ItemId::nil(),
            parent_id: ItemId::nil(),
        });
        assert_eq!(cycle.exit_code(), 4);

        let external = CliError::Coordinator(CoordinatorError::ExternalBlobDocument(ItemId::nil()));
        assert_eq!(external.exit_code(), 5);
    }
}

//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "docvault",
    version,
    about = "Categories, documents and revision history in one SQLite vault"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Vault database file.
    #[arg(long = "db", env = "DOCVAULT_DB", value_name = "PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory for uploaded blobs.
    #[arg(
        long = "blob-dir",
        env = "DOCVAULT_BLOB_DIR",
        value_name = "DIR",
        global = true
    )]
    pub blob_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(
        long = "log-level",
        env = "DOCVAULT_LOG_LEVEL",
        value_name = "LEVEL",
        global = true
    )]
    pub log_level: Option<String>,

    /// Write rolling logs to this directory. Logging is off without it.
    #[arg(
        long = "log-dir",
        env = "DOCVAULT_LOG_DIR",
        value_name = "DIR",
        global = true
    )]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the full category/document forest.
    Tree,

    /// Print one item.
    Get {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Create a category.
    AddCategory {
        name: String,
        /// Parent category id. Omit for a root category.
        #[arg(long)]
        parent: Option<String>,
    },

    /// Create a document. Markdown and HTML files are stored inline,
    /// anything else is uploaded to blob storage.
    AddDocument(AddDocumentArgs),

    /// Rename an item.
    Rename {
        #[arg(value_name = "ID")]
        id: String,
        name: String,
    },

    /// Replace the inline content of a document.
    Edit(EditArgs),

    /// Replace the tag set of a document.
    Tags {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Move an item under another category, or to the root.
    Move {
        #[arg(value_name = "ID")]
        id: String,
        /// New parent category id. Omit to move to the root.
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete an item. Categories are deleted with everything under them.
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List the revisions of a document, newest first.
    History {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Print one revision including its content.
    ShowRevision {
        #[arg(value_name = "REVISION_ID")]
        revision_id: String,
    },

    /// Restore a document's content from one of its revisions.
    Revert {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "REVISION_ID")]
        revision_id: String,
    },

    /// Full-text search over inline documents.
    Search {
        query: String,
        #[arg(long, default_value_t = docvault_core::SEARCH_DEFAULT_LIMIT)]
        limit: u32,
    },

    /// Print the breadcrumb path from the root to an item.
    Path {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Args)]
pub struct AddDocumentArgs {
    pub name: String,

    /// Parent category id. Omit for a root document.
    #[arg(long)]
    pub parent: Option<String>,

    /// Tag to attach. Repeatable.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Read content from a file.
    #[arg(long, value_name = "PATH", conflicts_with = "content")]
    pub file: Option<PathBuf>,

    /// Inline content. Without `--file` or `--content` the document is blank.
    #[arg(long)]
    pub content: Option<String>,

    /// Treat inline content as HTML instead of markdown.
    #[arg(long)]
    pub html: bool,
}

#[derive(Args)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// New content.
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub content: Option<String>,

    /// Read new content from a file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Treat content as HTML instead of markdown.
    #[arg(long)]
    pub html: bool,

    /// Replace tags in the same write. Comma separated.
    #[arg(long, value_delimiter = ',', value_name = "TAGS")]
    pub tags: Option<Vec<String>>,
}

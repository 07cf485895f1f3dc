//! Runtime configuration resolved from flags and environment.

use crate::cli::GlobalArgs;
use std::path::PathBuf;

const DEFAULT_DB_FILE: &str = "docvault.sqlite3";
const DEFAULT_BLOB_DIR: &str = "blobs";

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub blob_dir: PathBuf,
    pub log_level: String,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Applies defaults to whatever flags and environment left unset.
    pub fn from_args(args: &GlobalArgs) -> Self {
        Self {
            db_path: args
                .db_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE)),
            blob_dir: args
                .blob_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_DIR)),
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| docvault_core::default_log_level().to_string()),
            log_dir: args.log_dir.clone(),
        }
    }
}

//! SQLite FTS5-based document search.
//!
//! # Invariants
//! - Only inline documents are indexed, so only they are returned.
//! - Result ordering is deterministic: bm25 rank, then `updated_at DESC`,
//!   then id.

use crate::db::DbError;
use crate::model::ItemId;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Default hit limit for document search.
pub const SEARCH_DEFAULT_LIMIT: u32 = 20;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// Query could not be parsed by FTS5.
    InvalidQuery { query: String, message: String },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text. Terms are matched literally and all must appear.
    pub text: String,
    /// Maximum number of hits to return.
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: SEARCH_DEFAULT_LIMIT,
        }
    }
}

/// Single ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchHit {
    pub item_id: ItemId,
    pub name: String,
    pub snippet: String,
}

/// Searches inline documents and returns ranked hits.
///
/// Returns an empty list for blank queries or a zero limit.
pub fn search_documents(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(&query.text) else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT
            items.id AS id,
            items.name AS name,
            snippet(items_fts, 2, '[', ']', ' ... ', 10) AS snippet
         FROM items_fts
         JOIN items ON items.id = items_fts.item_id
         WHERE items_fts MATCH ?1
           AND items.kind = 'document'
           AND items.storage_mode = 'inline'
         ORDER BY bm25(items_fts), items.updated_at DESC, items.id ASC
         LIMIT ?2;",
    )?;
    let mut rows = stmt
        .query(params![match_expr, i64::from(query.limit)])
        .map_err(|err| map_query_error(err, &match_expr))?;

    let mut hits = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }
    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let id_text: String = row.get("id")?;
    let item_id = Uuid::parse_str(&id_text)
        .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{id_text}`")))?;

    Ok(SearchHit {
        item_id,
        name: row.get("name")?,
        snippet: row.get("snippet")?,
    })
}

/// Quotes every whitespace-separated term and joins them with `AND`.
fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}

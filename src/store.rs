//! The append-only exchange log.
//!
//! Every completed prompt/response pair is persisted as an [`Exchange`] row
//! in a SQLite database. Rows are never updated or deleted; continuing a
//! conversation only appends new rows. Identifiers are assigned by SQLite
//! on insert and are strictly increasing, so the `id` column doubles as the
//! replay order within a conversation.
//!
//! A conversation is the set of rows sharing a conversation identifier. The
//! anchor row (the first exchange of a conversation) stores `NULL` for
//! `conversation_id`; its own `id` names the group. Lookups therefore use a
//! disjunctive query so the anchor is found exactly once.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::observability::{STORE_APPENDS, STORE_APPEND_ERRORS, STORE_READS};
use crate::utils;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER,
    system TEXT,
    prompt TEXT NOT NULL,
    response TEXT NOT NULL,
    model TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    duration_ms INTEGER,
    debug TEXT
);
CREATE INDEX IF NOT EXISTS log_conversation_id ON log (conversation_id);
";

/// One logged prompt/response pair, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    /// Store-assigned identifier, strictly increasing.
    pub id: i64,

    /// Identifier of the conversation this exchange continues.
    ///
    /// `None` means this row is its own conversation anchor and its `id`
    /// names the group.
    pub conversation_id: Option<i64>,

    /// System instruction in effect for this exchange, if any.
    pub system: Option<String>,

    /// The prompt sent to the model.
    pub prompt: String,

    /// The model's response.
    pub response: String,

    /// Identifier of the model that produced the response.
    pub model: String,

    /// Creation time, UTC.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Wall-clock duration of the remote call, in milliseconds.
    pub duration_ms: Option<i64>,

    /// Free-form diagnostic payload (echoed model id, usage accounting).
    pub debug: Option<serde_json::Value>,
}

/// An exchange about to be appended. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone, Default)]
pub struct NewExchange {
    /// Conversation this exchange continues; `None` starts a new one.
    pub conversation_id: Option<i64>,
    /// System instruction used for the call, if any.
    pub system: Option<String>,
    /// The prompt that was sent.
    pub prompt: String,
    /// The completed response.
    pub response: String,
    /// The model that was used.
    pub model: String,
    /// Wall-clock duration of the remote call, in milliseconds.
    pub duration_ms: Option<i64>,
    /// Diagnostic payload to persist alongside the exchange.
    pub debug: Option<serde_json::Value>,
}

/// Append-only SQLite-backed store of [`Exchange`] records.
///
/// The store is opened per invocation; independent processes may open the
/// same database concurrently. SQLite serializes writers, and each append
/// is a single-statement transaction, so identifier assignment stays atomic
/// and strictly increasing.
#[derive(Debug)]
pub struct LogStore {
    conn: Connection,
    path: PathBuf,
}

impl LogStore {
    /// Open an existing log database.
    ///
    /// The main flow never creates the backing file implicitly: a missing
    /// database is [`Error::StoreUnavailable`]. Use [`LogStore::initialize`]
    /// for explicit creation. The schema migration runs on every open and
    /// is idempotent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::store_unavailable(
                format!("no log database at {}", path.display()),
                None,
            ));
        }
        Self::open_inner(path)
    }

    /// Create the log database (and its parent directories) if absent, then
    /// open it. This is the only operation that creates the backing file.
    pub fn initialize<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::store_unavailable(
                        format!("cannot create {}: {e}", parent.display()),
                        None,
                    )
                })?;
            }
        }
        Self::open_inner(path)
    }

    fn open_inner(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            Error::store_unavailable(format!("cannot open {}: {e}", path.display()), Some(e))
        })?;
        conn.execute_batch(SCHEMA).map_err(|e| {
            Error::store_unavailable(format!("cannot migrate {}: {e}", path.display()), Some(e))
        })?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// The path of the backing database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an exchange, returning the identifier the store assigned.
    pub fn append(&self, rec: &NewExchange) -> Result<i64> {
        let timestamp = utils::time::format(&OffsetDateTime::now_utc())?;
        let debug = match &rec.debug {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        let inserted = self.conn.execute(
            "INSERT INTO log (conversation_id, system, prompt, response, model, timestamp, duration_ms, debug)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rec.conversation_id,
                rec.system,
                rec.prompt,
                rec.response,
                rec.model,
                timestamp,
                rec.duration_ms,
                debug,
            ],
        );
        match inserted {
            Ok(_) => {
                STORE_APPENDS.click();
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => {
                STORE_APPEND_ERRORS.click();
                Err(Error::store_unavailable(
                    format!("cannot append to {}: {e}", self.path.display()),
                    Some(e),
                ))
            }
        }
    }

    /// The conversation identifier of the exchange with the highest `id`,
    /// or `None` if the store is empty.
    pub fn most_recent_conversation(&self) -> Result<Option<i64>> {
        STORE_READS.click();
        let id = self
            .conn
            .query_row(
                "SELECT coalesce(conversation_id, id) FROM log ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    /// All exchanges belonging to a conversation, ordered by `id` ascending.
    ///
    /// Matches both the anchor row (`id = conversation`) and its follow-ups
    /// (`conversation_id = conversation`); the anchor appears exactly once.
    pub fn exchanges_for(&self, conversation: i64) -> Result<Vec<Exchange>> {
        STORE_READS.click();
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, system, prompt, response, model, timestamp, duration_ms, debug
             FROM log WHERE id = ?1 OR conversation_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![conversation], RawExchange::from_row)?;
        collect_exchanges(rows)
    }

    /// The most recent `limit` exchanges, newest first. `limit == 0` means
    /// unbounded.
    pub fn recent(&self, limit: usize) -> Result<Vec<Exchange>> {
        STORE_READS.click();
        const COLUMNS: &str =
            "id, conversation_id, system, prompt, response, model, timestamp, duration_ms, debug";
        if limit == 0 {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {COLUMNS} FROM log ORDER BY id DESC"))?;
            let rows = stmt.query_map([], RawExchange::from_row)?;
            collect_exchanges(rows)
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {COLUMNS} FROM log ORDER BY id DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], RawExchange::from_row)?;
            collect_exchanges(rows)
        }
    }
}

// Intermediate row shape so column extraction stays inside rusqlite's error
// type while timestamp/debug decoding uses ours.
struct RawExchange {
    id: i64,
    conversation_id: Option<i64>,
    system: Option<String>,
    prompt: String,
    response: String,
    model: String,
    timestamp: String,
    duration_ms: Option<i64>,
    debug: Option<String>,
}

impl RawExchange {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            system: row.get(2)?,
            prompt: row.get(3)?,
            response: row.get(4)?,
            model: row.get(5)?,
            timestamp: row.get(6)?,
            duration_ms: row.get(7)?,
            debug: row.get(8)?,
        })
    }

    fn into_exchange(self) -> Result<Exchange> {
        let timestamp = utils::time::parse(&self.timestamp)?;
        let debug = match self.debug {
            Some(text) => Some(serde_json::from_str(&text)?),
            None => None,
        };
        Ok(Exchange {
            id: self.id,
            conversation_id: self.conversation_id,
            system: self.system,
            prompt: self.prompt,
            response: self.response,
            model: self.model,
            timestamp,
            duration_ms: self.duration_ms,
            debug,
        })
    }
}

fn collect_exchanges(
    rows: impl Iterator<Item = rusqlite::Result<RawExchange>>,
) -> Result<Vec<Exchange>> {
    let mut exchanges = Vec::new();
    for row in rows {
        exchanges.push(row?.into_exchange()?);
    }
    Ok(exchanges)
}

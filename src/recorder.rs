//! Recording completed exchanges.
//!
//! Logging is opt-out and best-effort: a suppressed record, a missing
//! database, or a write failure all degrade to a silent no-op so the user
//! still sees the response they paid for. Only fully-completed exchanges
//! reach this module; a failed remote call records nothing.

use std::path::Path;

use crate::observability::RECORDS_SKIPPED;
use crate::store::{LogStore, NewExchange};

/// Append a completed exchange to the log database at `log_path`.
///
/// Returns the identifier the store assigned, or `None` when the record was
/// skipped (logging suppressed, database absent, or append failed). Callers
/// wanting to continue this conversation later use the returned id as the
/// conversation identifier when the exchange was its own anchor.
pub fn record(rec: &NewExchange, log_path: &Path, suppress: bool) -> Option<i64> {
    if suppress {
        RECORDS_SKIPPED.click();
        return None;
    }
    if !log_path.exists() {
        // The store never auto-creates its backing file from the main flow.
        RECORDS_SKIPPED.click();
        return None;
    }
    let store = match LogStore::open(log_path) {
        Ok(store) => store,
        Err(_) => {
            RECORDS_SKIPPED.click();
            return None;
        }
    };
    match store.append(rec) {
        Ok(id) => Some(id),
        Err(_) => {
            RECORDS_SKIPPED.click();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn completed(prompt: &str, conversation_id: Option<i64>) -> NewExchange {
        NewExchange {
            conversation_id,
            system: None,
            prompt: prompt.to_string(),
            response: format!("re: {prompt}"),
            model: "gpt-4o-mini".to_string(),
            duration_ms: Some(42),
            debug: None,
        }
    }

    #[test]
    fn records_against_an_initialized_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");
        LogStore::initialize(&path).unwrap();

        let id = record(&completed("hello", None), &path, false).unwrap();
        let store = LogStore::open(&path).unwrap();
        let rows = store.exchanges_for(id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prompt, "hello");
        assert_eq!(rows[0].conversation_id, None);
    }

    #[test]
    fn preserves_the_resolved_conversation_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");
        LogStore::initialize(&path).unwrap();

        let anchor = record(&completed("anchor", None), &path, false).unwrap();
        record(&completed("follow", Some(anchor)), &path, false).unwrap();

        let store = LogStore::open(&path).unwrap();
        let convo = store.exchanges_for(anchor).unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[1].conversation_id, Some(anchor));
    }

    #[test]
    fn suppressed_logging_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");
        LogStore::initialize(&path).unwrap();

        assert_eq!(record(&completed("quiet", None), &path, true), None);
        let store = LogStore::open(&path).unwrap();
        assert!(store.recent(0).unwrap().is_empty());
    }

    #[test]
    fn missing_database_is_a_silent_skip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");

        assert_eq!(record(&completed("nowhere", None), &path, false), None);
        // The recorder must not have created the file implicitly.
        assert!(!path.exists());
    }
}

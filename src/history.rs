//! Continuation resolution.
//!
//! A new prompt either starts a fresh conversation, continues the most
//! recently logged one, or continues an explicitly named one. This module
//! turns that request into a concrete conversation identifier plus the
//! ordered prior exchanges to replay.

use crate::error::{Error, Result};
use crate::store::{Exchange, LogStore};

/// How the new prompt relates to prior conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Start a new conversation.
    Fresh,

    /// Continue whichever conversation was logged most recently.
    MostRecent,

    /// Continue the conversation with this identifier.
    Conversation(i64),
}

impl Continuation {
    /// Build a continuation from the two command-line knobs.
    ///
    /// The modes are mutually exclusive; asking for both fails with
    /// [`Error::ConflictingContinuation`] before any I/O happens.
    pub fn from_flags(continue_latest: bool, conversation: Option<i64>) -> Result<Self> {
        match (continue_latest, conversation) {
            (true, Some(_)) => Err(Error::conflicting_continuation(
                "cannot combine --continue with --conversation",
            )),
            (true, None) => Ok(Continuation::MostRecent),
            (false, Some(id)) => Ok(Continuation::Conversation(id)),
            (false, None) => Ok(Continuation::Fresh),
        }
    }
}

/// The outcome of resolving a [`Continuation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHistory {
    /// The conversation the new exchange belongs to, if any.
    pub conversation_id: Option<i64>,

    /// Prior exchanges in replay order (ascending `id`).
    pub exchanges: Vec<Exchange>,
}

impl ResolvedHistory {
    fn fresh() -> Self {
        Self {
            conversation_id: None,
            exchanges: Vec::new(),
        }
    }

    /// The model used by the last exchange in the history, if any.
    ///
    /// Callers use this as the default model for the new call, so a
    /// continued conversation stays on the model it started with.
    pub fn last_model(&self) -> Option<&str> {
        self.exchanges.last().map(|e| e.model.as_str())
    }
}

/// Resolve a continuation against the log store.
///
/// `store` is `None` when the backing database does not exist. Continuation
/// is meaningless without history, so any continuation mode then fails with
/// [`Error::LoggingRequired`]. An *empty* store is different: continuing
/// the most recent conversation of an empty store is just a fresh
/// conversation.
pub fn resolve(continuation: Continuation, store: Option<&LogStore>) -> Result<ResolvedHistory> {
    let store = match (continuation, store) {
        (Continuation::Fresh, _) => return Ok(ResolvedHistory::fresh()),
        (_, None) => {
            return Err(Error::logging_required(
                "continuation requires a log database; run `banter-logs --init` to create one",
            ));
        }
        (_, Some(store)) => store,
    };
    let conversation = match continuation {
        Continuation::Fresh => unreachable!("handled above"),
        Continuation::MostRecent => match store.most_recent_conversation()? {
            Some(id) => id,
            None => return Ok(ResolvedHistory::fresh()),
        },
        Continuation::Conversation(id) => id,
    };
    let exchanges = store.exchanges_for(conversation)?;
    Ok(ResolvedHistory {
        conversation_id: Some(conversation),
        exchanges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewExchange;
    use tempfile::TempDir;

    fn store_with(prompts: &[(&str, Option<i64>, &str)]) -> (TempDir, LogStore) {
        let dir = TempDir::new().unwrap();
        let store = LogStore::initialize(dir.path().join("logs.db")).unwrap();
        for (prompt, conversation_id, model) in prompts {
            store
                .append(&NewExchange {
                    conversation_id: *conversation_id,
                    prompt: prompt.to_string(),
                    response: format!("re: {prompt}"),
                    model: model.to_string(),
                    ..NewExchange::default()
                })
                .unwrap();
        }
        (dir, store)
    }

    #[test]
    fn from_flags_rejects_both_modes() {
        let err = Continuation::from_flags(true, Some(7)).unwrap_err();
        assert!(err.is_conflicting_continuation());
    }

    #[test]
    fn from_flags_maps_each_mode() {
        assert_eq!(
            Continuation::from_flags(false, None).unwrap(),
            Continuation::Fresh
        );
        assert_eq!(
            Continuation::from_flags(true, None).unwrap(),
            Continuation::MostRecent
        );
        assert_eq!(
            Continuation::from_flags(false, Some(3)).unwrap(),
            Continuation::Conversation(3)
        );
    }

    #[test]
    fn fresh_never_touches_the_store() {
        let resolved = resolve(Continuation::Fresh, None).unwrap();
        assert_eq!(resolved.conversation_id, None);
        assert!(resolved.exchanges.is_empty());
    }

    #[test]
    fn continuation_without_store_requires_logging() {
        let err = resolve(Continuation::MostRecent, None).unwrap_err();
        assert!(err.is_logging_required());
        let err = resolve(Continuation::Conversation(1), None).unwrap_err();
        assert!(err.is_logging_required());
    }

    #[test]
    fn most_recent_on_empty_store_is_fresh() {
        let (_dir, store) = store_with(&[]);
        let resolved = resolve(Continuation::MostRecent, Some(&store)).unwrap();
        assert_eq!(resolved.conversation_id, None);
        assert!(resolved.exchanges.is_empty());
    }

    #[test]
    fn most_recent_resolves_to_latest_conversation() {
        let (_dir, store) = store_with(&[
            ("first", None, "gpt-4o"),
            ("second", None, "gpt-4o-mini"),
            ("second again", Some(2), "gpt-4o-mini"),
        ]);
        let resolved = resolve(Continuation::MostRecent, Some(&store)).unwrap();
        assert_eq!(resolved.conversation_id, Some(2));
        assert_eq!(resolved.exchanges.len(), 2);
        assert_eq!(resolved.exchanges[0].prompt, "second");
        assert_eq!(resolved.exchanges[1].prompt, "second again");
    }

    #[test]
    fn explicit_conversation_loads_in_replay_order() {
        let (_dir, store) = store_with(&[
            ("anchor", None, "gpt-4o"),
            ("noise", None, "gpt-4o"),
            ("follow", Some(1), "gpt-4o"),
        ]);
        let resolved = resolve(Continuation::Conversation(1), Some(&store)).unwrap();
        assert_eq!(resolved.conversation_id, Some(1));
        let ids: Vec<i64> = resolved.exchanges.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn last_model_comes_from_newest_exchange() {
        let (_dir, store) = store_with(&[
            ("anchor", None, "gpt-4o"),
            ("follow", Some(1), "gpt-4-turbo"),
        ]);
        let resolved = resolve(Continuation::Conversation(1), Some(&store)).unwrap();
        assert_eq!(resolved.last_model(), Some("gpt-4-turbo"));

        let fresh = resolve(Continuation::Fresh, Some(&store)).unwrap();
        assert_eq!(fresh.last_model(), None);
    }
}

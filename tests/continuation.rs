//! End-to-end tests for the continuation and logging pipeline.
//!
//! These drive the same RESOLVE -> BUILD -> call -> RECORD sequence the
//! banter-prompt binary runs, with the remote call simulated.

use std::path::Path;

use tempfile::TempDir;

use banter::{
    Continuation, Error, LogStore, NewExchange, build_messages, history, recorder,
};

/// Run one invocation of the core pipeline with a simulated remote call.
///
/// `outcome` stands in for the provider: `Ok(text)` completes the exchange,
/// `Err(_)` is a failed call and must record nothing.
fn run_exchange(
    log_path: &Path,
    continuation: Continuation,
    system: Option<&str>,
    prompt: &str,
    model: &str,
    outcome: banter::Result<String>,
) -> banter::Result<Option<i64>> {
    let store = if log_path.exists() {
        Some(LogStore::open(log_path)?)
    } else {
        None
    };
    let resolved = history::resolve(continuation, store.as_ref())?;
    drop(store);

    let messages = build_messages(&resolved.exchanges, system, prompt);
    assert!(!messages.is_empty());

    let response = outcome?;

    let rec = NewExchange {
        conversation_id: resolved.conversation_id,
        system: system.map(String::from),
        prompt: prompt.to_string(),
        response,
        model: model.to_string(),
        duration_ms: Some(1),
        debug: None,
    };
    Ok(recorder::record(&rec, log_path, false))
}

fn ok(text: &str) -> banter::Result<String> {
    Ok(text.to_string())
}

#[test]
fn conversation_grows_across_invocations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.db");
    LogStore::initialize(&path).unwrap();

    let anchor = run_exchange(&path, Continuation::Fresh, None, "first", "gpt-4o", ok("one"))
        .unwrap()
        .unwrap();
    run_exchange(
        &path,
        Continuation::MostRecent,
        None,
        "second",
        "gpt-4o",
        ok("two"),
    )
    .unwrap()
    .unwrap();
    run_exchange(
        &path,
        Continuation::Conversation(anchor),
        None,
        "third",
        "gpt-4o",
        ok("three"),
    )
    .unwrap()
    .unwrap();

    let store = LogStore::open(&path).unwrap();
    let convo = store.exchanges_for(anchor).unwrap();
    let prompts: Vec<&str> = convo.iter().map(|e| e.prompt.as_str()).collect();
    assert_eq!(prompts, vec!["first", "second", "third"]);
    assert_eq!(convo[0].conversation_id, None);
    assert_eq!(convo[1].conversation_id, Some(anchor));
    assert_eq!(convo[2].conversation_id, Some(anchor));
}

#[test]
fn failed_remote_call_records_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.db");
    LogStore::initialize(&path).unwrap();

    run_exchange(&path, Continuation::Fresh, None, "seed", "gpt-4o", ok("seeded"))
        .unwrap()
        .unwrap();
    let before = LogStore::open(&path).unwrap().recent(0).unwrap().len();

    let err = run_exchange(
        &path,
        Continuation::MostRecent,
        None,
        "doomed",
        "gpt-4o",
        Err(Error::api(500, None, "upstream exploded".to_string())),
    )
    .unwrap_err();
    assert!(err.is_provider());

    let after = LogStore::open(&path).unwrap().recent(0).unwrap().len();
    assert_eq!(before, after);
}

#[test]
fn replay_includes_mid_conversation_system_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.db");
    LogStore::initialize(&path).unwrap();

    let anchor = run_exchange(
        &path,
        Continuation::Fresh,
        Some("be formal"),
        "hello",
        "gpt-4o",
        ok("Good day."),
    )
    .unwrap()
    .unwrap();
    run_exchange(
        &path,
        Continuation::Conversation(anchor),
        Some("be casual"),
        "hey again",
        "gpt-4o",
        ok("yo"),
    )
    .unwrap()
    .unwrap();

    let store = LogStore::open(&path).unwrap();
    let resolved = history::resolve(Continuation::Conversation(anchor), Some(&store)).unwrap();
    let messages = build_messages(&resolved.exchanges, None, "third prompt");
    // Two fully-populated exchanges then the bare new prompt: 3*2 + 1.
    assert_eq!(messages.len(), 7);
    let systems: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == banter::Role::System)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(systems, vec!["be formal", "be casual"]);
}

#[test]
fn continuing_most_recent_without_a_database_requires_logging() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.db");

    let err = run_exchange(
        &path,
        Continuation::MostRecent,
        None,
        "anyone there",
        "gpt-4o",
        ok("unused"),
    )
    .unwrap_err();
    assert!(err.is_logging_required());
    assert!(!path.exists());
}

#[test]
fn fresh_invocation_without_a_database_still_answers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.db");

    // No database: the response flows, recording silently skips.
    let recorded = run_exchange(
        &path,
        Continuation::Fresh,
        None,
        "hello",
        "gpt-4o",
        ok("hi"),
    )
    .unwrap();
    assert_eq!(recorded, None);
    assert!(!path.exists());
}

#[test]
fn model_follows_the_conversation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs.db");
    LogStore::initialize(&path).unwrap();

    run_exchange(&path, Continuation::Fresh, None, "start", "gpt-4-turbo", ok("ok"))
        .unwrap()
        .unwrap();

    let store = LogStore::open(&path).unwrap();
    let resolved = history::resolve(Continuation::MostRecent, Some(&store)).unwrap();
    assert_eq!(resolved.last_model(), Some("gpt-4-turbo"));
}

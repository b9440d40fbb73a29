//! Live API tests. These require an API key in the environment to run.

use banter::{ChatMessage, ChatRequest, OpenAi};

#[tokio::test]
async fn simple_completion_request() {
    // This test requires BANTER_API_KEY or OPENAI_API_KEY to be set.
    if std::env::var("BANTER_API_KEY").is_err() && std::env::var("OPENAI_API_KEY").is_err() {
        eprintln!("Skipping test: no API key set");
        return;
    }

    let client = OpenAi::new(None).expect("Failed to create client");
    let request = ChatRequest::new(
        "gpt-4o-mini",
        vec![ChatMessage::user("Say 'test passed'")],
    );
    let response = client.complete(&request).await;
    assert!(response.is_ok(), "Request should succeed with valid API key");
}

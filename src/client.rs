//! Client for OpenAI-compatible chat completion APIs.
//!
//! This is the remote-call boundary: it accepts a model plus the ordered
//! message list and returns response text, usage accounting, and the
//! resolved model identifier. Provider and authentication errors surface to
//! the caller verbatim; nothing here touches the log store.

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::messages::ChatMessage;
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_ERRORS, STREAM_EVENTS,
};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The model to use.
    pub model: String,

    /// Ordered role-tagged messages.
    pub messages: Vec<ChatMessage>,

    /// Whether to stream the response.
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new buffered request.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
        }
    }
}

/// Token usage accounting echoed by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens produced in the completion.
    #[serde(default)]
    pub completion_tokens: u64,

    /// Total tokens billed.
    #[serde(default)]
    pub total_tokens: u64,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// The assistant message for this choice.
    pub message: AssistantMessage,
}

/// The assistant message inside a buffered completion.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    /// The response text.
    #[serde(default)]
    pub content: Option<String>,
}

/// A buffered chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    /// The model that actually served the request.
    pub model: String,

    /// Completion choices; the first one carries the response.
    pub choices: Vec<Choice>,

    /// Usage accounting, when the provider reports it.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// The response text of the first choice.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
    }
}

/// An incremental delta inside a streamed chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    /// New response text, if this chunk carries any.
    #[serde(default)]
    pub content: Option<String>,
}

/// One choice inside a streamed chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// The incremental delta.
    #[serde(default)]
    pub delta: Delta,
}

/// One server-sent chunk of a streamed completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    /// The model that is serving the request.
    #[serde(default)]
    pub model: Option<String>,

    /// Chunk choices; the first one carries the delta.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatChunk {
    /// The delta text of the first choice, if any.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl OpenAi {
    /// Create a new client.
    ///
    /// The API key can be provided directly or read from the BANTER_API_KEY
    /// or OPENAI_API_KEY environment variables.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var("BANTER_API_KEY")
                .or_else(|_| env::var("OPENAI_API_KEY"))
                .map_err(|_| {
                    Error::authentication(
                        "API key not provided and neither BANTER_API_KEY nor OPENAI_API_KEY is set",
                    )
                })?,
        };

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout,
        })
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed_error = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let error_type = parsed_error
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .and_then(|e| e.error_type.clone());
        let error_message = parsed_error
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());

        match status_code {
            401 | 403 => Error::authentication(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Send a request and get a buffered response.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let url = format!("{}chat/completions", self.base_url);
        let start = Instant::now();
        CLIENT_REQUESTS.click();

        let mut request = request.clone();
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let completion = response.json::<ChatCompletion>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        Ok(completion)
    }

    /// Send a request and get a streaming response.
    ///
    /// Returns a stream of [`ChatChunk`] objects that can be processed
    /// incrementally; the stream ends at the provider's `[DONE]` marker.
    pub async fn stream(
        &self,
        request: &ChatRequest,
    ) -> Result<impl Stream<Item = Result<ChatChunk>>> {
        let url = format!("{}chat/completions", self.base_url);
        CLIENT_REQUESTS.click();

        let mut request = request.clone();
        request.stream = true;

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        Ok(process_sse(response.bytes_stream()))
    }
}

/// Process a stream of bytes into a stream of chat chunks.
fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<ChatChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type.
    let stream = byte_stream.map(|result| {
        result.map_err(|e| {
            STREAM_ERRORS.click();
            Error::streaming(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
        })
    });

    // Use a state machine to process the SSE stream.
    let buffer = String::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer.
                match extract_event(&buffer) {
                    SseEvent::Chunk(event, remaining) => {
                        buffer = remaining;
                        STREAM_EVENTS.click();
                        return Some((event, (stream, buffer, false)));
                    }
                    SseEvent::Done => {
                        return None;
                    }
                    SseEvent::Incomplete => {}
                }

                // Read more data.
                match stream.next().await {
                    Some(Ok(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => buffer.push_str(&text),
                        Err(e) => {
                            STREAM_ERRORS.click();
                            return Some((
                                Err(Error::encoding(
                                    format!("Invalid UTF-8 in stream: {}", e),
                                    Some(Box::new(e)),
                                )),
                                (stream, buffer, true),
                            ));
                        }
                    },
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // End of stream; drain anything still buffered.
                        if !buffer.is_empty() {
                            buffer.push_str("\n\n");
                            if let SseEvent::Chunk(event, _) = extract_event(&buffer) {
                                STREAM_EVENTS.click();
                                return Some((event, (stream, String::new(), true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

enum SseEvent {
    /// A parsed chunk plus the remaining buffer.
    Chunk(Result<ChatChunk>, String),
    /// The `[DONE]` marker ended the stream.
    Done,
    /// No complete event buffered yet.
    Incomplete,
}

/// Extract a complete SSE event from a buffer string.
fn extract_event(buffer: &str) -> SseEvent {
    // Simple SSE parsing - each event is delimited by double newlines.
    let parts: Vec<&str> = buffer.splitn(2, "\n\n").collect();
    if parts.len() != 2 {
        return SseEvent::Incomplete;
    }

    let event_text = parts[0];
    let rest = parts[1].to_string();

    let mut data = None;
    for line in event_text.lines() {
        if line.starts_with("data: ") {
            data = Some(line.trim_start_matches("data: "));
        }
    }

    match data {
        Some("[DONE]") => SseEvent::Done,
        Some(json_str) => match serde_json::from_str::<ChatChunk>(json_str) {
            Ok(event) => SseEvent::Chunk(Ok(event), rest),
            Err(e) => {
                STREAM_ERRORS.click();
                SseEvent::Chunk(
                    Err(Error::serialization(
                        format!("Failed to parse event JSON: {}", e),
                        Some(Box::new(e)),
                    )),
                    rest,
                )
            }
        },
        // Comment or keep-alive; skip it.
        None => SseEvent::Chunk(Ok(ChatChunk::default()), rest),
    }
}

impl Default for ChatChunk {
    fn default() -> Self {
        Self {
            model: None,
            choices: Vec::new(),
        }
    }
}

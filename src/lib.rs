//! banter: a command-line client for chat-completion APIs with persistent
//! conversation logs.
//!
//! Prompts and responses are appended to a local SQLite database so a later
//! invocation can continue a prior conversation. The crate is organized
//! around that flow:
//!
//! - [`store`]: the append-only exchange log
//! - [`history`]: continuation resolution against the log
//! - [`messages`]: building the role-tagged model input
//! - [`recorder`]: best-effort recording of completed exchanges
//! - [`client`]: the remote chat-completions call
//! - [`templates`]: YAML prompt templates
//! - [`config`]: paths and model defaults

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod messages;
pub mod observability;
pub mod recorder;
pub mod store;
pub mod templates;
pub mod utils;

// Re-exports
pub use client::{ChatCompletion, ChatRequest, OpenAi, Usage};
pub use config::{Config, DEFAULT_MODEL, MODEL_ALIASES, resolve_model_alias};
pub use error::{Error, Result};
pub use history::{Continuation, ResolvedHistory, resolve};
pub use messages::{ChatMessage, Role, build_messages};
pub use observability::register_biometrics;
pub use recorder::record;
pub use store::{Exchange, LogStore, NewExchange};
pub use templates::{Template, TemplateDir};

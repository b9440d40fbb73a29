//! Send a prompt to a chat-completion API and log the exchange.
//!
//! # Usage
//!
//! ```bash
//! # One-shot prompt
//! banter-prompt 'Five outrageous names for a pet pelican'
//!
//! # Continue the most recent conversation
//! banter-prompt --continue-latest 'Now make them nautical'
//!
//! # Continue a specific conversation by id
//! banter-prompt --conversation 42 'And one more'
//!
//! # Run a template with parameters, input piped on stdin
//! cat report.txt | banter-prompt --template summarize audience=execs
//! ```
//!
//! Exchanges are appended to the log database created by
//! `banter-logs --init`; logging silently skips when the database is
//! absent or `--no-log` is given.

use std::collections::HashMap;
use std::io::{IsTerminal, Read, Write};
use std::time::Instant;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use futures::StreamExt;

use banter::{
    ChatRequest, Config, Continuation, DEFAULT_MODEL, Error, LogStore, MODEL_ALIASES, NewExchange,
    OpenAi, TemplateDir, build_messages, history, recorder, resolve_model_alias,
};

/// Command-line arguments for the banter-prompt tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// System prompt for the call.
    #[arrrg(optional, "System prompt to use", "PROMPT")]
    system: Option<String>,

    /// Model to use; aliases from the built-in table are accepted.
    #[arrrg(optional, "Model to use (aliases: 4o, 4o-mini, 4, ...)", "MODEL")]
    model: Option<String>,

    /// Template to resolve the prompt and system from.
    #[arrrg(optional, "Template to use; free arguments become NAME=VALUE parameters", "NAME")]
    template: Option<String>,

    /// Buffer the whole response instead of streaming it.
    #[arrrg(flag, "Do not stream output")]
    no_stream: bool,

    /// Skip logging this exchange.
    #[arrrg(flag, "Do not log the exchange to the database")]
    no_log: bool,

    /// Continue the most recent conversation.
    #[arrrg(flag, "Continue the most recent conversation")]
    continue_latest: bool,

    /// Continue the conversation with the given id.
    #[arrrg(optional, "Continue the conversation with the given id", "ID")]
    conversation: Option<i64>,

    /// API key override.
    #[arrrg(optional, "API key to use", "KEY")]
    key: Option<String>,

    /// Endpoint override for OpenAI-compatible providers.
    #[arrrg(optional, "Base URL of the chat-completions endpoint", "URL")]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() {
    let (args, free) = Args::from_command_line_relaxed("banter-prompt [OPTIONS] [PROMPT]...");
    if let Err(err) = run(args, free).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: Args, free: Vec<String>) -> banter::Result<()> {
    let config = Config::from_env();

    // Resolve the prompt/system pair, from a template or from the arguments.
    let (prompt, system, template_model) = if let Some(name) = &args.template {
        if args.system.is_some() {
            return Err(Error::validation(
                "cannot use --template and --system together",
                Some("template".to_string()),
            ));
        }
        let params = parse_params(&free)?;
        let input = read_stdin_if_piped()?;
        let template = TemplateDir::new(&config.templates_dir).load(name)?;
        let model = template.model.clone();
        let (prompt, system) = template.execute(&input, &params)?;
        (prompt, system, model)
    } else {
        let prompt = if free.is_empty() {
            read_stdin()?
        } else {
            free.join(" ")
        };
        (prompt, args.system.clone(), None)
    };
    if prompt.trim().is_empty() {
        return Err(Error::validation(
            "no prompt provided",
            Some("prompt".to_string()),
        ));
    }

    // RESOLVE: errors here abort before any network cost.
    let continuation = Continuation::from_flags(args.continue_latest, args.conversation)?;
    let store = match continuation {
        Continuation::Fresh => None,
        _ if config.log_path.exists() => Some(LogStore::open(&config.log_path)?),
        _ => None,
    };
    let resolved = history::resolve(continuation, store.as_ref())?;
    drop(store);

    // BUILD
    let messages = build_messages(&resolved.exchanges, system.as_deref(), &prompt);
    let model = match &args.model {
        Some(name) => resolve_model_alias(MODEL_ALIASES, name),
        None => template_model
            .or_else(|| resolved.last_model().map(String::from))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
    };

    // Remote call. Provider and authentication errors pass through; a
    // failed call records nothing.
    let client = OpenAi::with_options(args.key.clone(), args.base_url.clone(), None)?;
    let request = ChatRequest::new(model.clone(), messages);
    let start = Instant::now();

    let (response, debug) = if args.no_stream {
        let completion = client.complete(&request).await?;
        println!("{}", completion.content());
        let debug = serde_json::json!({
            "model": completion.model,
            "usage": completion.usage,
        });
        (completion.content().to_string(), Some(debug))
    } else {
        let stream = client.stream(&request).await?;
        futures::pin_mut!(stream);
        let mut response = String::new();
        let mut served_by = None;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(model) = &chunk.model {
                served_by = Some(model.clone());
            }
            if let Some(delta) = chunk.delta_content() {
                write!(stdout, "{delta}")?;
                stdout.flush()?;
                response.push_str(delta);
            }
        }
        writeln!(stdout)?;
        let debug = served_by.map(|model| serde_json::json!({ "model": model }));
        (response, debug)
    };
    let duration_ms = start.elapsed().as_millis() as i64;

    // RECORD: best-effort, never hides the response we already printed.
    let rec = NewExchange {
        conversation_id: resolved.conversation_id,
        system,
        prompt,
        response,
        model,
        duration_ms: Some(duration_ms),
        debug,
    };
    recorder::record(&rec, &config.log_path, args.no_log);
    Ok(())
}

/// Parse free arguments of the form `NAME=VALUE` into template parameters.
fn parse_params(free: &[String]) -> banter::Result<HashMap<String, String>> {
    let mut params = HashMap::new();
    for arg in free {
        match arg.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                params.insert(name.to_string(), value.to_string());
            }
            _ => {
                return Err(Error::validation(
                    format!("expected NAME=VALUE, got {arg:?}"),
                    Some("param".to_string()),
                ));
            }
        }
    }
    Ok(params)
}

fn read_stdin() -> banter::Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Templates only consume stdin when something was actually piped in.
fn read_stdin_if_piped() -> banter::Result<String> {
    if std::io::stdin().is_terminal() {
        Ok(String::new())
    } else {
        read_stdin()
    }
}

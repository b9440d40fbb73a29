//! List and inspect prompt templates.
//!
//! # Usage
//!
//! ```bash
//! # List available templates with a preview of each prompt
//! banter-templates
//!
//! # Show one template as YAML
//! banter-templates summarize
//!
//! # Print the templates directory
//! banter-templates --location
//! ```

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use banter::{Config, Template, TemplateDir, utils};

/// Command-line arguments for the banter-templates tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// Print the templates directory and exit.
    #[arrrg(flag, "Print the templates directory and exit")]
    location: bool,
}

fn main() {
    let (args, free) = Args::from_command_line_relaxed("banter-templates [OPTIONS] [NAME]");
    if let Err(err) = run(args, free) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args, free: Vec<String>) -> banter::Result<()> {
    let config = Config::from_env();
    let templates = TemplateDir::new(&config.templates_dir);

    if args.location {
        println!("{}", templates.path().display());
        return Ok(());
    }

    match free.first() {
        Some(name) => show(&templates, name),
        None => list(&templates),
    }
}

fn show(templates: &TemplateDir, name: &str) -> banter::Result<()> {
    let template = templates.load(name)?;
    print!("{}", serde_yaml::to_string(&to_yaml(&template))?);
    Ok(())
}

fn list(templates: &TemplateDir) -> banter::Result<()> {
    let all = templates.list()?;
    let width = all.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for template in &all {
        let preview = template.prompt.as_deref().unwrap_or("");
        let line = format!("{:<width$} : {}", template.name, preview);
        println!("{}", utils::truncate_string(&line, console_width()));
    }
    Ok(())
}

fn to_yaml(template: &Template) -> serde_yaml::Mapping {
    let mut map = serde_yaml::Mapping::new();
    map.insert("name".into(), template.name.clone().into());
    if let Some(prompt) = &template.prompt {
        map.insert("prompt".into(), prompt.clone().into());
    }
    if let Some(system) = &template.system {
        map.insert("system".into(), system.clone().into());
    }
    if let Some(model) = &template.model {
        map.insert("model".into(), model.clone().into());
    }
    map
}

fn console_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(80)
}

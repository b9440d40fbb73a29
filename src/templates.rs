//! Prompt templates.
//!
//! A template is a YAML file resolving to a (prompt, system, default model)
//! triple before any history resolution begins. `$name` placeholders are
//! substituted from `--param` values; `$input` is the text piped on stdin.
//! A file containing a bare YAML string is shorthand for `prompt: <string>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// A loaded prompt template.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    /// Name of the template (the file stem).
    #[serde(skip)]
    pub name: String,

    /// Prompt text with `$variable` placeholders. When absent, the piped
    /// input is used as the prompt verbatim.
    #[serde(default)]
    pub prompt: Option<String>,

    /// System instruction with `$variable` placeholders.
    #[serde(default)]
    pub system: Option<String>,

    /// Model to use when the caller does not name one.
    #[serde(default)]
    pub model: Option<String>,
}

impl Template {
    /// Resolve the template against the piped input and parameters.
    ///
    /// Returns the substituted `(prompt, system)` pair. Placeholders with no
    /// matching parameter fail with a [`Error::Template`] naming every
    /// missing variable.
    pub fn execute(
        &self,
        input: &str,
        params: &HashMap<String, String>,
    ) -> Result<(String, Option<String>)> {
        let mut vars = params.clone();
        vars.insert("input".to_string(), input.to_string());

        let prompt = match self.prompt.as_deref() {
            Some(text) => self.interpolate(text, &vars)?,
            None => input.to_string(),
        };
        let system = match self.system.as_deref() {
            Some(text) => Some(self.interpolate(text, &vars)?),
            None => None,
        };
        Ok((prompt, system))
    }

    fn interpolate(&self, text: &str, vars: &HashMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut missing: Vec<String> = Vec::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                // `$$` is a literal dollar sign.
                Some('$') => {
                    chars.next();
                    out.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        name.push(c);
                    }
                    self.substitute(&name, vars, &mut out, &mut missing);
                }
                Some(c) if c.is_alphanumeric() || *c == '_' => {
                    let mut name = String::new();
                    while let Some(c) = chars.peek() {
                        if c.is_alphanumeric() || *c == '_' {
                            name.push(*c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    self.substitute(&name, vars, &mut out, &mut missing);
                }
                _ => out.push('$'),
            }
        }
        if missing.is_empty() {
            Ok(out)
        } else {
            missing.sort();
            missing.dedup();
            Err(Error::template(
                format!("missing variables: {}", missing.join(", ")),
                Some(self.name.clone()),
            ))
        }
    }

    fn substitute(
        &self,
        name: &str,
        vars: &HashMap<String, String>,
        out: &mut String,
        missing: &mut Vec<String>,
    ) {
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => missing.push(name.to_string()),
        }
    }
}

/// A directory of `<name>.yaml` template files.
#[derive(Debug, Clone)]
pub struct TemplateDir {
    dir: PathBuf,
}

impl TemplateDir {
    /// Wrap a templates directory. The directory need not exist yet; a
    /// missing directory simply has no templates.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Load the named template.
    pub fn load(&self, name: &str) -> Result<Template> {
        let path = self.dir.join(format!("{name}.yaml"));
        if !path.exists() {
            return Err(Error::template(
                "no such template",
                Some(name.to_string()),
            ));
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("cannot read {}: {e}", path.display()), e))?;
        Self::parse(name, &text)
    }

    /// All templates in the directory, sorted by name.
    pub fn list(&self) -> Result<Vec<Template>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut templates = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .map_err(|e| Error::io(format!("cannot list {}: {e}", self.dir.display()), e))?
        {
            let path = entry
                .map_err(|e| Error::io(format!("cannot list {}: {e}", self.dir.display()), e))?
                .path();
            if path.extension().is_none_or(|ext| ext != "yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                templates.push(self.load(stem)?);
            }
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    fn parse(name: &str, text: &str) -> Result<Template> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| Error::template(format!("invalid YAML: {e}"), Some(name.to_string())))?;
        let mut template = if let serde_yaml::Value::String(prompt) = value {
            Template {
                name: String::new(),
                prompt: Some(prompt),
                system: None,
                model: None,
            }
        } else {
            serde_yaml::from_value(value).map_err(|e| {
                Error::template(format!("invalid template: {e}"), Some(name.to_string()))
            })?
        };
        template.name = name.to_string();
        Ok(template)
    }
}

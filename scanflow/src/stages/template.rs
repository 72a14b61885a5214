//! Command templates with `{name}` placeholders.
//!
//! `{{` and `}}` produce literal braces. Placeholder names may contain ASCII
//! letters, digits, `_`, `-` and `:` (as in `{input:export}`).

use crate::errors::{Result, ScanflowError};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A command line with placeholders, rendered once per stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
}

impl CommandTemplate {
    /// Wraps a raw template string. Syntax is checked by [`Self::placeholders`]
    /// and [`Self::render`].
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Returns the raw template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the placeholder names in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns a template error if the syntax is invalid.
    pub fn placeholders(&self) -> Result<Vec<String>> {
        Ok(parse(&self.raw)?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Var(name) => Some(name),
                Segment::Text(_) => None,
            })
            .collect())
    }

    /// Substitutes every placeholder.
    ///
    /// # Errors
    ///
    /// Returns a template error if the syntax is invalid or a placeholder has
    /// no value.
    pub fn render(&self, vars: &TemplateVars) -> Result<String> {
        let mut rendered = String::with_capacity(self.raw.len());
        for segment in parse(&self.raw)? {
            match segment {
                Segment::Text(text) => rendered.push_str(&text),
                Segment::Var(name) => {
                    let value = vars.get(&name).ok_or_else(|| {
                        ScanflowError::Template(format!(
                            "no value for placeholder '{{{name}}}' in '{}'",
                            self.raw
                        ))
                    })?;
                    rendered.push_str(value);
                }
            }
        }
        Ok(rendered)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for CommandTemplate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CommandTemplate {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Values available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`Self::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns true if a value is set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')
}

fn parse(raw: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) if is_name_char(ch) => name.push(ch),
                        Some(ch) => {
                            return Err(ScanflowError::Template(format!(
                                "invalid character '{ch}' in placeholder in '{raw}'"
                            )))
                        }
                        None => {
                            return Err(ScanflowError::Template(format!(
                                "unterminated placeholder in '{raw}'"
                            )))
                        }
                    }
                }
                if name.is_empty() {
                    return Err(ScanflowError::Template(format!(
                        "empty placeholder in '{raw}'"
                    )));
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Var(name));
            }
            '}' => {
                return Err(ScanflowError::Template(format!(
                    "unmatched '}}' in '{raw}'"
                )))
            }
            other => text.push(other),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

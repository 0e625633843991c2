//! Build environment construction.
//!
//! The environment handed to a library's build script is assembled by
//! successive merges: toolchain values, then the host config, then the
//! library's common `env`, then the library's per-host `env`. Each string
//! value may reference keys that are already present using `{KEY}`
//! placeholders; `{{` and `}}` produce literal braces.
//!
//! `CFLAGS` and `LDFLAGS` accumulate across merges instead of being
//! overwritten.

use std::fmt;

use thiserror::Error;
use toml::{Table, Value};

use crate::builder::errors::BuildError;

/// Variables that accumulate (space-joined) instead of being replaced.
pub const ACCUMULATING_KEYS: &[&str] = &["CFLAGS", "LDFLAGS"];

/// Error while expanding a `{KEY}` template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unresolved placeholder `{{{key}}}` in `{template}`")]
    Unresolved { key: String, template: String },

    #[error("unbalanced `{brace}` in `{template}`")]
    Unbalanced { brace: char, template: String },
}

/// An ordered mapping of environment variable name to value.
///
/// Insertion order is preserved; overwriting a key keeps its original
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: Vec<(String, String)>,
}

impl BuildEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        BuildEnvironment { vars: Vec::new() }
    }

    /// Get the value of a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a variable is defined.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    /// Iterate over variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Expand `{KEY}` placeholders in `template` against the current contents.
    pub fn expand(&self, template: &str) -> Result<String, TemplateError> {
        render(template, |key| self.get(key))
    }

    /// Merge a TOML table into the environment.
    ///
    /// String values are expanded against the environment as it stands at
    /// that point, so entries can reference keys defined earlier in the same
    /// table. Non-string values (per-host sub-tables, numbers) are skipped.
    pub fn update(&mut self, update: &Table) -> Result<(), BuildError> {
        for (key, value) in update {
            let Value::String(raw) = value else {
                tracing::trace!("skipping non-string env entry `{}`", key);
                continue;
            };

            let expanded = self.expand(raw).map_err(|source| BuildError::Template {
                key: key.clone(),
                source,
            })?;

            if ACCUMULATING_KEYS.contains(&key.as_str()) {
                if let Some(existing) = self.get(key) {
                    let joined = format!("{} {}", existing, expanded);
                    self.set(key.clone(), joined);
                    continue;
                }
            }

            self.set(key.clone(), expanded);
        }

        Ok(())
    }

    /// Export lines suitable for pasting into a shell.
    pub fn export_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(k, v)| format!("export {}=\"{}\"", k, v))
            .collect()
    }
}

impl fmt::Display for BuildEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.export_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = BuildEnvironment::new();
        for (k, v) in iter {
            env.set(k, v);
        }
        env
    }
}

/// Render a template, looking placeholders up with `lookup`.
pub fn render<'a, F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(TemplateError::Unbalanced {
                                brace: '{',
                                template: template.to_string(),
                            })
                        }
                        Some(ch) => key.push(ch),
                    }
                }
                let value = lookup(&key).ok_or_else(|| TemplateError::Unresolved {
                    key: key.clone(),
                    template: template.to_string(),
                })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(TemplateError::Unbalanced {
                    brace: '}',
                    template: template.to_string(),
                })
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

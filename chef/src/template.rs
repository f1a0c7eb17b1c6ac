//! Prompt templates with `{name}` placeholders.
//!
//! A [`Template`] is parsed once, when it is built, so a bad delimiter shows up
//! at startup instead of on some later request. Rendering is then a single
//! literal pass over the parsed segments: substituted values are never parsed
//! again, so a value like `"{cuisine}"` ends up in the prompt as written.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::errors::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// An immutable prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    segments: Vec<Segment>,
    placeholders: Vec<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl Template {
    /// Parse a template, checking that every `{` has a matching `}` around a
    /// non-empty name.
    pub fn new(text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();
        if text.is_empty() {
            return Err(TemplateError::Malformed {
                offset: 0,
                reason: "template is empty",
            });
        }

        let mut segments = vec![];
        let mut placeholders: Vec<String> = vec![];
        let mut literal_start = 0;
        let mut open = None;
        for (offset, c) in text.char_indices() {
            match (c, open) {
                ('{', None) => {
                    if literal_start < offset {
                        segments.push(Segment::Literal(text[literal_start..offset].to_string()));
                    }
                    open = Some(offset);
                }
                ('{', Some(_)) => {
                    return Err(TemplateError::Malformed {
                        offset,
                        reason: "`{` inside an open placeholder",
                    })
                }
                ('}', None) => {
                    return Err(TemplateError::Malformed {
                        offset,
                        reason: "`}` without a matching `{`",
                    })
                }
                ('}', Some(start)) => {
                    let name = &text[start + 1..offset];
                    if name.is_empty() {
                        return Err(TemplateError::Malformed {
                            offset: start,
                            reason: "placeholder name is empty",
                        });
                    }
                    if !name.chars().all(is_name_char) {
                        return Err(TemplateError::Malformed {
                            offset: start,
                            reason: "placeholder name may only hold letters, digits, `_` and `-`",
                        });
                    }
                    if !placeholders.iter().any(|known| known == name) {
                        placeholders.push(name.to_string());
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                    open = None;
                    literal_start = offset + 1;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            return Err(TemplateError::Malformed {
                offset: start,
                reason: "`{` is never closed",
            });
        }
        if literal_start < text.len() {
            segments.push(Segment::Literal(text[literal_start..].to_string()));
        }

        Ok(Self {
            text,
            segments,
            placeholders,
        })
    }

    /// The template exactly as it was written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Substitute every placeholder with its value from `parameters`.
    ///
    /// Fails on the first placeholder that has no entry. Entries the template
    /// never mentions are ignored.
    pub fn render(&self, parameters: &ParameterSet) -> Result<Prompt, TemplateError> {
        let mut text = String::with_capacity(self.text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => text.push_str(literal),
                Segment::Placeholder(name) => {
                    let value =
                        parameters
                            .get(name)
                            .ok_or_else(|| TemplateError::MissingParameter {
                                name: name.clone(),
                            })?;
                    text.push_str(value);
                }
            }
        }
        Ok(Prompt(text))
    }
}

/// Render `template` with `parameters`. See [`Template::render`].
pub fn render(template: &Template, parameters: &ParameterSet) -> Result<Prompt, TemplateError> {
    template.render(parameters)
}

/// Values for the placeholders of a template, keyed by name.
///
/// A name that is absent and a name bound to `""` are different things: the
/// first fails to render, the second renders as nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(HashMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// The fully rendered text for one model call.
///
/// Not `Clone`; every request renders its own.
#[derive(Debug, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for Prompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Notification text templates with `{title}` and `{game}` placeholders.

use std::fmt;

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Title,
    Game,
}

/// A parsed notification template.
///
/// `{{` and `}}` render as literal braces, any other brace usage must be one
/// of the known placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// # Errors
    ///
    /// Returns [`Error::Template`] on unknown placeholders or unbalanced
    /// braces.
    pub fn parse(source: &str) -> Result<Self, Error> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(Error::Template(format!(
                                    "unclosed placeholder in {source:?}"
                                )));
                            }
                        }
                    }
                    let placeholder = match name.as_str() {
                        "title" => Segment::Title,
                        "game" => Segment::Game,
                        other => {
                            return Err(Error::Template(format!(
                                "unknown placeholder {{{other}}} in {source:?}"
                            )));
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(placeholder);
                }
                '}' => {
                    return Err(Error::Template(format!(
                        "single '}}' encountered in {source:?}"
                    )));
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn render(&self, title: &str, game: &str) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Title => title,
                Segment::Game => game,
            })
            .collect()
    }
}

impl TryFrom<String> for Template {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

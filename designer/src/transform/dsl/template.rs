//! `{name}` placeholder templates.
//!
//! Used by `paste` and by the job templates. `{{` and `}}` stand for literal
//! braces; any other brace must belong to a `{name}` placeholder.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a bare `{name}` placeholder inside an already rendered value.
pub static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([\w-]+)\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`, failing on a stray `{` / `}` or an empty `{}`.
    pub fn parse(source: &str) -> Result<Self, String> {
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
                            Some('{') | None => {
                                return Err(format!("unclosed '{{' in template '{}'", source));
                            }
                            Some(ch) => name.push(ch),
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(format!("empty placeholder '{{}}' in template '{}'", source));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => return Err(format!("single '}}' in template '{}'", source)),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholder names, first occurrence order, without duplicates.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder through `lookup`.
    ///
    /// Returns the name of the first placeholder `lookup` cannot resolve.
    pub fn render<'a, F>(&self, lookup: F) -> Result<String, String>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    out.push_str(lookup(name).ok_or_else(|| name.clone())?);
                }
            }
        }
        Ok(out)
    }
}

/// Turn `{{` / `}}` back into single braces.
pub fn unescape_braces(value: &str) -> String {
    value.replace("{{", "{").replace("}}", "}")
}

//! Template reference parser.
//!
//! A reference looks like `type.segment(.segment)*`. A segment starting with
//! a single quote runs to the next quote, so `cookie.'a.b'` addresses the
//! cookie literally named `a.b`. References appear inside strings wrapped in
//! braces: `"hello {env.NAME}"`.

use std::ops::Range;

use crate::error::{Exception, Result};

/// A parsed template reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The original text (without braces).
    pub raw: String,
    /// Resolver type (e.g. `env`).
    pub kind: String,
    /// Accessor path below the type.
    pub path: Vec<String>,
}

impl Reference {
    /// The path joined with dots.
    pub fn field_path(&self) -> String {
        self.path.join(".")
    }
}

/// A `{...}` marker found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'s> {
    /// Byte range of the marker, braces included.
    pub span: Range<usize>,
    /// The reference text between the braces.
    pub expression: &'s str,
}

/// Parser for template references and markers.
pub struct ReferenceParser;

impl ReferenceParser {
    /// Parse a reference expression (without braces).
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::inputs::ReferenceParser;
    ///
    /// let reference = ReferenceParser::parse("cookie.'user.v2'.json.access_token").unwrap();
    /// assert_eq!(reference.kind, "cookie");
    /// assert_eq!(reference.path, vec!["user.v2", "json", "access_token"]);
    /// ```
    pub fn parse(expression: &str) -> Result<Reference> {
        let mut segments = Self::segments(expression).into_iter();
        let (Some(kind), path) = (segments.next(), segments.collect::<Vec<_>>()) else {
            return Err(unparseable(expression));
        };
        if path.is_empty() {
            return Err(unparseable(expression));
        }
        Ok(Reference {
            raw: expression.to_string(),
            kind,
            path,
        })
    }

    /// Split an expression into segments, honouring quoted segments.
    ///
    /// Empty segments (as in `a..b`) are dropped. An unterminated quote is
    /// kept as a literal character.
    pub fn segments(expression: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut rest = expression;

        while let Some(ch) = rest.chars().next() {
            if ch == '.' {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                rest = &rest[1..];
                continue;
            }
            if ch == '\'' && current.is_empty() {
                if let Some(end) = rest[1..].find('\'') {
                    current.push_str(&rest[1..=end]);
                    rest = &rest[end + 2..];
                    continue;
                }
            }
            current.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    /// Find every `{...}` marker in `input`.
    ///
    /// A marker body is one or more of `[A-Za-z0-9_-'/.*]`; braces around
    /// anything else are plain text.
    pub fn markers(input: &str) -> Vec<Marker<'_>> {
        let bytes = input.as_bytes();
        let mut markers = Vec::new();
        let mut start = 0;

        while let Some(offset) = input[start..].find('{') {
            let open = start + offset;
            let body_start = open + 1;
            let body_len = bytes[body_start..]
                .iter()
                .take_while(|b| is_marker_byte(**b))
                .count();
            let close = body_start + body_len;
            if body_len > 0 && bytes.get(close) == Some(&b'}') {
                markers.push(Marker {
                    span: open..close + 1,
                    expression: &input[body_start..close],
                });
                start = close + 1;
            } else {
                start = body_start;
            }
        }
        markers
    }

    /// If the whole of `input` is exactly one marker, return its expression.
    pub fn whole_marker(input: &str) -> Option<&str> {
        match Self::markers(input).as_slice() {
            [only] if only.span == (0..input.len()) => Some(only.expression),
            _ => None,
        }
    }
}

fn is_marker_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'\'' | b'/' | b'.' | b'*')
}

fn unparseable(expression: &str) -> Exception {
    Exception::config(format!("unable to parse variable [{expression}]"))
}

//! @ai:module:intent Parse a single comment's text into expected issue codes and details
//! @ai:module:layer application
//! @ai:module:public_api PragmaParser, parse_pragma
//! @ai:module:depends_on annotation
//! @ai:module:stateless true
//!
//! Grammar, informally:
//!
//! ```text
//! comment  := segment (";" segment)* ";"?
//! segment  := free-text "[" CODE "]" (":" detail ("," detail)*)? trailing-text
//! detail   := COLUMN MESSAGE? | MESSAGE COLUMN?
//! MESSAGE  := '"' ( [^"\\] | '\' any )* '"'
//! ```
//!
//! Segments that do not fit are skipped, the rest of the comment is still read.

use crate::annotation::{is_issue_code, Detail, Pragma};
use regex::Regex;

/// @ai:intent Reusable annotation grammar parser holding its compiled lexer patterns
#[derive(Debug, Clone)]
pub struct PragmaParser {
    code: Regex,
    column: Regex,
    message: Regex,
}

impl Default for PragmaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PragmaParser {
    /// @ai:intent Compile the lexer patterns
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            code: Regex::new(r"\[([^\[\]\s]+)\]").expect("Invalid regex"),
            column: Regex::new(r"^\s*(\d+)").expect("Invalid regex"),
            message: Regex::new(r#"^\s*"((?:[^"\\]|\\.)*)""#).expect("Invalid regex"),
        }
    }

    /// @ai:intent Parse the text following a comment prefix
    /// @ai:post result is None when no segment holds a bracketed issue code
    /// @ai:example ("[GO-W1000]") -> Some({GO-W1000: []})
    /// @ai:example ("foobar") -> None
    /// @ai:effects pure
    pub fn parse(&self, comment: &str) -> Option<Pragma> {
        let mut pragma = Pragma::new();

        for segment in split_unquoted(comment, ';') {
            if let Some((code, details)) = self.parse_segment(segment) {
                pragma.extend_details(code, details);
            }
        }

        if pragma.is_empty() {
            None
        } else {
            Some(pragma)
        }
    }

    fn parse_segment<'a>(&self, segment: &'a str) -> Option<(&'a str, Vec<Detail>)> {
        let (code, rest) = self.find_code(segment)?;

        let Some(list) = rest.trim_start().strip_prefix(':') else {
            return Some((code, Vec::new()));
        };

        let details = self.parse_details(list);
        if details.is_empty() {
            return None;
        }

        Some((code, details))
    }

    /// @ai:intent Locate the first bracketed issue code, skipping leading free text
    fn find_code<'a>(&self, segment: &'a str) -> Option<(&'a str, &'a str)> {
        self.code.captures_iter(segment).find_map(|captures| {
            let code = captures.get(1)?;
            if !is_issue_code(code.as_str()) {
                return None;
            }
            let end = captures.get(0)?.end();
            Some((code.as_str(), &segment[end..]))
        })
    }

    fn parse_details(&self, list: &str) -> Vec<Detail> {
        let mut details = Vec::new();
        let mut rest = list;

        while let Some((detail, after)) = self.parse_detail(rest) {
            details.push(detail);

            match after.trim_start().strip_prefix(',') {
                Some(next) => rest = next,
                None => break,
            }
        }

        details
    }

    fn parse_detail<'a>(&self, input: &'a str) -> Option<(Detail, &'a str)> {
        if let Some((column, rest)) = self.take_column(input) {
            return Some(match self.take_message(rest) {
                Some((message, rest)) => (Detail::new(column, message), rest),
                None => (Detail::new(column, ""), rest),
            });
        }

        let (message, rest) = self.take_message(input)?;
        Some(match self.take_column(rest) {
            Some((column, rest)) => (Detail::new(column, message), rest),
            None => (Detail::new(0, message), rest),
        })
    }

    fn take_column<'a>(&self, input: &'a str) -> Option<(usize, &'a str)> {
        let captures = self.column.captures(input)?;
        let column = captures.get(1)?.as_str().parse().ok()?;
        Some((column, &input[captures.get(0)?.end()..]))
    }

    fn take_message<'a>(&self, input: &'a str) -> Option<(String, &'a str)> {
        let captures = self.message.captures(input)?;
        let message = unescape(captures.get(1)?.as_str());
        Some((message, &input[captures.get(0)?.end()..]))
    }
}

/// @ai:intent Parse a comment with a freshly built parser
/// @ai:effects pure
pub fn parse_pragma(comment: &str) -> Option<Pragma> {
    PragmaParser::new().parse(comment)
}

/// @ai:intent Split on a separator that is not inside a double-quoted string
/// @ai:effects pure
fn split_unquoted(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(&input[start..]);
    parts
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some(next @ ('"' | '\\')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }

    out
}

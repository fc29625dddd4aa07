//! @ai:module:intent Define the expected-issue data recovered from fixture comments
//! @ai:module:layer domain
//! @ai:module:public_api Pragma, Detail, CheckMode, is_issue_code
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// @ai:intent Check whether a token has the lexical shape of an issue code
/// @ai:example ("GO-W1000") -> true
/// @ai:example ("PY-1234") -> true
/// @ai:example ("issue-code") -> false
/// @ai:effects pure
pub fn is_issue_code(token: &str) -> bool {
    let Some((prefix, rest)) = token.split_once('-') else {
        return false;
    };

    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }

    let digits = match rest.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => &rest[c.len_utf8()..],
        _ => rest,
    };

    (1..=4).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// @ai:intent Per-file policy restricting which issue codes are checked
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckMode {
    #[default]
    CheckAll,
    CheckInclude,
    CheckExclude,
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckMode::CheckAll => "CheckAll",
            CheckMode::CheckInclude => "CheckInclude",
            CheckMode::CheckExclude => "CheckExclude",
        };
        f.write_str(name)
    }
}

/// @ai:intent One expected occurrence of an issue code
/// @ai:invariant column 0 matches any column, an empty message matches any title
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Detail {
    pub column: usize,
    pub message: String,
    #[serde(default)]
    pub hit: bool,
}

impl Detail {
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
            hit: false,
        }
    }

    /// @ai:intent Check if a reported column/title satisfies this detail
    /// @ai:effects pure
    pub fn matches(&self, column: usize, title: &str) -> bool {
        (self.column == 0 || self.column == column) && (self.message.is_empty() || self.message == title)
    }
}

/// @ai:intent Expected issues anchored to one source line, keyed by issue code
/// @ai:invariant every key of `issues` has an entry in `hit`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pragma {
    pub issues: BTreeMap<String, Vec<Detail>>,
    pub hit: BTreeMap<String, bool>,

    /// Set while the pragma sits on the line below the comment-only line it
    /// was read from, and no code-line comment has been merged into it yet.
    #[serde(skip)]
    pub(crate) standalone: bool,
}

impl PartialEq for Pragma {
    fn eq(&self, other: &Self) -> bool {
        self.issues == other.issues && self.hit == other.hit
    }
}

impl Eq for Pragma {}

impl Pragma {
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Register an issue code without constraining its details
    pub fn insert_code(&mut self, code: &str) {
        self.issues.entry(code.to_string()).or_default();
        self.hit.entry(code.to_string()).or_insert(false);
    }

    /// @ai:intent Append expected details for an issue code, registering it if needed
    pub fn extend_details(&mut self, code: &str, details: impl IntoIterator<Item = Detail>) {
        self.insert_code(code);
        if let Some(existing) = self.issues.get_mut(code) {
            existing.extend(details);
        }
    }

    /// @ai:intent Fold another pragma into this one
    /// @ai:post details of a shared code keep self's entries first, then other's
    /// @ai:effects pure
    pub fn merge(&mut self, other: Pragma) {
        for (code, details) in other.issues {
            self.issues.entry(code).or_default().extend(details);
        }

        for (code, hit) in other.hit {
            let entry = self.hit.entry(code).or_insert(false);
            *entry |= hit;
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.contains_key(code)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// @ai:intent Mark an annotated code as reported; unknown codes are ignored
    pub fn mark_hit(&mut self, code: &str) {
        if let Some(hit) = self.hit.get_mut(code) {
            *hit = true;
        }
    }
}

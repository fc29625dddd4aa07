//! @ai:module:intent Extract line-anchored pragmas and the check mode from a fixture file
//! @ai:module:layer application
//! @ai:module:public_api PragmaFile, parse_check_directive, CHECK_DIRECTIVE, IGNORE_DIRECTIVE
//! @ai:module:depends_on annotation, parser
//! @ai:module:stateless true

use crate::annotation::{is_issue_code, CheckMode, Pragma};
use crate::parser::PragmaParser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// First-line directive restricting the file to the listed issue codes.
pub const CHECK_DIRECTIVE: &str = "scatr-check:";

/// First-line directive excluding the listed issue codes from the file.
pub const IGNORE_DIRECTIVE: &str = "scatr-ignore:";

/// @ai:intent Annotation index of one fixture file
/// @ai:invariant pragmas is keyed by 1-based line numbers
#[derive(Debug, Clone, Default, Serialize)]
pub struct PragmaFile {
    pub comment_prefix: Vec<String>,
    pub pragmas: BTreeMap<usize, Pragma>,
    pub check_mode: CheckMode,
    /// Codes the check mode applies to. Empty means unrestricted.
    pub issue_codes: Vec<String>,
    /// Base name without extension, when it is itself an issue code.
    pub name_code: Option<String>,
}

impl PragmaFile {
    /// @ai:intent Build the annotation index for a file
    /// @ai:pre name is the file's base name, content its full text
    /// @ai:effects pure
    pub fn new(name: &str, content: &str, comment_prefix: &[String]) -> Self {
        Self::with_parser(&PragmaParser::new(), name, content, comment_prefix)
    }

    /// @ai:intent Build the annotation index reusing an existing grammar parser
    /// @ai:effects pure
    pub fn with_parser(
        parser: &PragmaParser,
        name: &str,
        content: &str,
        comment_prefix: &[String],
    ) -> Self {
        let mut file = Self {
            comment_prefix: comment_prefix.to_vec(),
            name_code: code_from_file_name(name),
            ..Default::default()
        };
        file.extract_pragmas(parser, content);
        file
    }

    fn extract_pragmas(&mut self, parser: &PragmaParser, content: &str) {
        for (idx, raw_line) in content.lines().enumerate() {
            let line_num = idx + 1;
            let line = raw_line.trim();

            let Some(target) = self.place_pragma(parser, line, line_num) else {
                continue;
            };

            // Stack a run of comment-only annotation lines onto the code line below them.
            if !self.is_comment_line(line) {
                continue;
            }

            let previous = target - 1;
            let foldable = self
                .pragmas
                .get(&previous)
                .is_some_and(|pragma| pragma.standalone);

            if foldable {
                if let Some(previous_pragma) = self.pragmas.remove(&previous) {
                    if let Some(pragma) = self.pragmas.get_mut(&target) {
                        pragma.merge(previous_pragma);
                    }
                }
            }
        }
    }

    /// @ai:intent Parse the first annotated comment on a line and store it at its target line
    /// @ai:post returns the target line when a pragma was stored
    fn place_pragma(&mut self, parser: &PragmaParser, line: &str, line_num: usize) -> Option<usize> {
        for prefix in &self.comment_prefix {
            let Some(pos) = line.find(prefix.as_str()) else {
                continue;
            };
            let text = &line[pos + prefix.len()..];

            if line_num == 1 && self.check_mode == CheckMode::CheckAll {
                if let Some((mode, codes)) = parse_check_directive(text) {
                    self.check_mode = mode;
                    self.issue_codes.extend(codes);
                }
            }

            let Some(mut pragma) = parser.parse(text) else {
                continue;
            };

            // A comment-only line documents the line after it.
            let comment_only = pos == 0;
            let target = if comment_only { line_num + 1 } else { line_num };

            if let Some(existing) = self.pragmas.remove(&target) {
                pragma.merge(existing);
            }
            pragma.standalone = comment_only;

            self.pragmas.insert(target, pragma);
            return Some(target);
        }

        None
    }

    fn is_comment_line(&self, line: &str) -> bool {
        self.comment_prefix
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }

    /// @ai:intent Decide whether diagnostics for an issue code are reported for this file
    /// @ai:effects pure
    pub fn reports(&self, code: &str) -> bool {
        mode_reports(self.check_mode, &self.issue_codes, code)
    }
}

/// @ai:intent Apply an include/exclude code list to one issue code
/// @ai:effects pure
pub(crate) fn mode_reports(mode: CheckMode, issue_codes: &[String], code: &str) -> bool {
    if mode == CheckMode::CheckAll || issue_codes.is_empty() {
        return true;
    }

    let listed = issue_codes.iter().any(|c| c == code);
    match mode {
        CheckMode::CheckInclude => listed,
        CheckMode::CheckExclude => !listed,
        CheckMode::CheckAll => true,
    }
}

/// @ai:intent Read a `scatr-check:` / `scatr-ignore:` directive and its code list
/// @ai:post codes that are not shaped like issue codes are dropped
/// @ai:example ("scatr-ignore: PY-W1000, oops") -> Some((CheckExclude, ["PY-W1000"]))
/// @ai:effects pure
pub fn parse_check_directive(comment: &str) -> Option<(CheckMode, Vec<String>)> {
    let comment = comment.trim();

    let (mode, codes) = if let Some(codes) = comment.strip_prefix(CHECK_DIRECTIVE) {
        (CheckMode::CheckInclude, codes)
    } else if let Some(codes) = comment.strip_prefix(IGNORE_DIRECTIVE) {
        (CheckMode::CheckExclude, codes)
    } else {
        return None;
    };

    let codes = codes
        .split(',')
        .map(str::trim)
        .filter(|code| is_issue_code(code))
        .map(str::to_string)
        .collect();

    Some((mode, codes))
}

fn code_from_file_name(name: &str) -> Option<String> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    is_issue_code(stem).then(|| stem.to_string())
}

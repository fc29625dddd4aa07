//! @ai:module:intent Reconcile reported issues against the pragmas of fixture files
//! @ai:module:layer application
//! @ai:module:public_api diff_checks, match_file_name_issue_codes, should_report, ChecksDiff, IssuesForFile, PragmaFiles
//! @ai:module:depends_on annotation, extractor, result
//! @ai:module:stateless false
//!
//! Reported issues are processed first and set hit flags on the pragmas they
//! match. Only then are the pragmas walked for expectations that were never
//! hit, so the order of the two passes matters.

use crate::annotation::CheckMode;
use crate::extractor::{mode_reports, PragmaFile};
use crate::result::Issue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Fixture files keyed by their normalized path.
pub type PragmaFiles = BTreeMap<PathBuf, PragmaFile>;

/// @ai:intent Diagnostics for one fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuesForFile {
    pub unexpected: Vec<Issue>,
    #[serde(rename = "not-raised")]
    pub not_raised: Vec<Issue>,
}

/// @ai:intent Result of reconciling one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecksDiff {
    pub passed: bool,
    /// Only files with at least one diagnostic are kept.
    pub files: BTreeMap<PathBuf, IssuesForFile>,
}

impl ChecksDiff {
    /// @ai:intent Count unexpected and not-raised diagnostics
    /// @ai:effects pure
    pub fn counts(&self) -> (usize, usize) {
        self.files.values().fold((0, 0), |(unexpected, not_raised), issues| {
            (
                unexpected + issues.unexpected.len(),
                not_raised + issues.not_raised.len(),
            )
        })
    }

    fn unexpected(&mut self, path: &Path, issue: Issue) {
        self.passed = false;
        self.files
            .entry(path.to_path_buf())
            .or_default()
            .unexpected
            .push(issue);
    }

    fn not_raised(&mut self, path: &Path, issue: Issue) {
        self.passed = false;
        self.files
            .entry(path.to_path_buf())
            .or_default()
            .not_raised
            .push(issue);
    }
}

/// @ai:intent Decide whether a diagnostic for `code` is reported for an optional file
/// @ai:example (None, "GO-W1000") -> true
/// @ai:effects pure
pub fn should_report(file: Option<&PragmaFile>, code: &str) -> bool {
    file.map_or(true, |file| file.reports(code))
}

/// @ai:intent Restrict files named after an issue code to that code
/// @ai:pre issues are the complete analysis result
/// @ai:post a CheckAll file whose name code was reported is CheckInclude for that code
pub fn match_file_name_issue_codes(files: &mut PragmaFiles, issues: &[Issue]) {
    let reported: BTreeSet<&str> = issues.iter().map(|issue| issue.code.as_str()).collect();

    for file in files.values_mut() {
        // A directive comment takes priority over the file name.
        if file.check_mode != CheckMode::CheckAll {
            continue;
        }

        let Some(code) = file.name_code.as_deref() else {
            continue;
        };

        if reported.contains(code) {
            file.issue_codes = vec![code.to_string()];
            file.check_mode = CheckMode::CheckInclude;
        }
    }
}

/// @ai:intent Match reported issues to pragmas and collect unexpected / not-raised diagnostics
/// @ai:pre issues carry normalized file paths comparable with the keys of `files`
/// @ai:post passed is true iff no diagnostic was produced
/// @ai:effects mutates hit flags of `files`
/// @ai:complexity O(issues * details per line + total pragma details)
pub fn diff_checks(
    files: &mut PragmaFiles,
    excluded_dirs: &[PathBuf],
    included_files: &BTreeSet<PathBuf>,
    issues: &[Issue],
) -> ChecksDiff {
    let mut diff = ChecksDiff {
        passed: true,
        ..Default::default()
    };

    match_file_name_issue_codes(files, issues);

    for issue in issues {
        let path = issue.normalized_file();
        if is_excluded(path, excluded_dirs) {
            continue;
        }

        let Some(file) = files.get_mut(path) else {
            if !included_files.is_empty() && !included_files.contains(path) {
                continue;
            }

            if should_report(None, &issue.code) {
                diff.unexpected(path, issue.clone());
            }
            continue;
        };

        let reports = file.reports(&issue.code);

        let Some(pragma) = file.pragmas.get_mut(&issue.line()) else {
            if reports {
                diff.unexpected(path, issue.clone());
            }
            continue;
        };

        let matched = match pragma.issues.get_mut(&issue.code) {
            // Wrong code on an annotated line.
            None => false,
            Some(details) if details.is_empty() => true,
            Some(details) => match details
                .iter_mut()
                .find(|detail| detail.matches(issue.column(), &issue.title))
            {
                Some(detail) => {
                    detail.hit = true;
                    true
                }
                None => false,
            },
        };

        // The code fired on this line even when no detail matched.
        pragma.mark_hit(&issue.code);

        if !matched && reports {
            diff.unexpected(path, issue.clone());
        }
    }

    for (path, file) in files.iter_mut() {
        if is_excluded(path, excluded_dirs) {
            continue;
        }

        let PragmaFile {
            pragmas,
            check_mode,
            issue_codes,
            ..
        } = file;
        let check_mode = *check_mode;
        let issue_codes = issue_codes.as_slice();

        for (&line, pragma) in pragmas.iter_mut() {
            for (code, details) in &pragma.issues {
                for detail in details.iter().filter(|detail| !detail.hit) {
                    pragma.hit.insert(code.clone(), true);

                    if mode_reports(check_mode, issue_codes, code) {
                        let issue = Issue::new(code.as_str(), detail.message.as_str(), line, detail.column)
                            .with_normalized_file(path.clone());
                        diff.not_raised(path, issue);
                    }
                }
            }

            for (code, hit) in &pragma.hit {
                if !hit && mode_reports(check_mode, issue_codes, code) {
                    let issue = Issue::new(code.as_str(), "", line, 0).with_normalized_file(path.clone());
                    diff.not_raised(path, issue);
                }
            }
        }
    }

    diff
}

/// @ai:intent Check whether a normalized path lies under one of the excluded directories
/// @ai:effects pure
pub fn is_excluded(path: &Path, excluded_dirs: &[PathBuf]) -> bool {
    excluded_dirs.iter().any(|dir| path.starts_with(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GO_FILE: &str = r#"package main

import (
	"fmt"
)

func main() {
	// [GO-W1000]
	fmt.Println("Hello World")
}
"#;

    fn files(entries: &[(&str, &str, &str)]) -> PragmaFiles {
        entries
            .iter()
            .map(|(path, name, content)| {
                let prefixes = vec!["//".to_string(), "#".to_string()];
                (PathBuf::from(path), PragmaFile::new(name, content, &prefixes))
            })
            .collect()
    }

    fn issue(path: &str, code: &str, title: &str, line: usize, column: usize) -> Issue {
        Issue::new(code, title, line, column).with_normalized_file(path)
    }

    fn run(files: &mut PragmaFiles, issues: &[Issue]) -> ChecksDiff {
        diff_checks(files, &[], &BTreeSet::new(), issues)
    }

    #[test]
    fn test_expected_issue_passes() {
        let mut files = files(&[("/t/main.go", "main.go", GO_FILE)]);
        let diff = run(&mut files, &[issue("/t/main.go", "GO-W1000", "", 9, 2)]);

        assert!(diff.passed);
        assert!(diff.files.is_empty());
    }

    #[test]
    fn test_unannotated_issue_is_unexpected() {
        let content = GO_FILE.replace("// [GO-W1000]", "// nothing here");
        let mut files = files(&[("/t/main.go", "main.go", &content)]);
        let reported = issue("/t/main.go", "GO-W1000", "", 9, 2);

        let diff = run(&mut files, &[reported.clone()]);

        assert!(!diff.passed);
        assert_eq!(diff.files[Path::new("/t/main.go")].unexpected, vec![reported]);
        assert!(diff.files[Path::new("/t/main.go")].not_raised.is_empty());
    }

    #[test]
    fn test_annotated_issue_not_raised() {
        let mut files = files(&[("/t/main.go", "main.go", GO_FILE)]);
        let diff = run(&mut files, &[]);

        assert!(!diff.passed);
        let not_raised = &diff.files[Path::new("/t/main.go")].not_raised;
        assert_eq!(not_raised.len(), 1);
        assert_eq!(not_raised[0].code, "GO-W1000");
        assert_eq!(not_raised[0].line(), 9);
        assert_eq!(not_raised[0].column(), 0);
        assert_eq!(not_raised[0].title, "");
    }

    #[test]
    fn test_detail_round_trip() {
        let content = "x := 1 // [GO-W1000]: 4 \"Hello\"\n";
        let mut files = files(&[("/t/a.go", "a.go", content)]);

        let diff = run(&mut files, &[issue("/t/a.go", "GO-W1000", "Hello", 1, 4)]);

        assert!(diff.passed);
        assert!(files[Path::new("/t/a.go")].pragmas[&1].issues["GO-W1000"][0].hit);
    }

    #[test]
    fn test_detail_mismatch_is_unexpected_and_not_raised() {
        let content = "x := 1 // [GO-W1000]: 4 \"Hello\"\n";
        let mut files = files(&[("/t/a.go", "a.go", content)]);
        let reported = issue("/t/a.go", "GO-W1000", "World", 1, 4);

        let diff = run(&mut files, &[reported.clone()]);
        let issues = &diff.files[Path::new("/t/a.go")];

        assert!(!diff.passed);
        assert_eq!(issues.unexpected, vec![reported]);
        // The code fired, so only the unmatched detail is reported.
        assert_eq!(issues.not_raised.len(), 1);
        assert_eq!(issues.not_raised[0].title, "Hello");
        assert_eq!(issues.not_raised[0].column(), 4);
    }

    #[test]
    fn test_unmatched_details_reported_once_each() {
        let content = "x := 1 // [GO-W1000]: 4, 8\n";
        let mut files = files(&[("/t/a.go", "a.go", content)]);

        let diff = run(&mut files, &[issue("/t/a.go", "GO-W1000", "", 1, 8)]);
        let not_raised = &diff.files[Path::new("/t/a.go")].not_raised;

        assert_eq!(not_raised.len(), 1);
        assert_eq!(not_raised[0].column(), 4);

        let mut fresh = self::files(&[("/t/a.go", "a.go", content)]);
        let diff = run(&mut fresh, &[]);
        let columns: Vec<usize> = diff.files[Path::new("/t/a.go")]
            .not_raised
            .iter()
            .map(Issue::column)
            .collect();
        assert_eq!(columns, vec![4, 8]);
    }

    #[test]
    fn test_code_mismatch_on_annotated_line() {
        let content = "x := 1 // [GO-W1000]\n";
        let mut files = files(&[("/t/a.go", "a.go", content)]);
        let reported = issue("/t/a.go", "GO-W1001", "", 1, 0);

        let diff = run(&mut files, &[reported.clone()]);
        let issues = &diff.files[Path::new("/t/a.go")];

        assert_eq!(issues.unexpected, vec![reported]);
        assert_eq!(issues.not_raised.len(), 1);
        assert_eq!(issues.not_raised[0].code, "GO-W1000");
    }

    #[test]
    fn test_unknown_file_is_unexpected() {
        let mut files = files(&[("/t/a.go", "a.go", "x := 1\n")]);
        let reported = issue("/t/other.go", "GO-W1000", "", 3, 0);

        let diff = run(&mut files, &[reported.clone()]);

        assert!(!diff.passed);
        assert_eq!(diff.files[Path::new("/t/other.go")].unexpected, vec![reported]);
    }

    #[test]
    fn test_unknown_file_outside_included_set_is_skipped() {
        let mut files = files(&[("/t/a.go", "a.go", "x := 1\n")]);
        let included = BTreeSet::from([PathBuf::from("/t/a.go")]);

        let diff = diff_checks(
            &mut files,
            &[],
            &included,
            &[issue("/t/other.go", "GO-W1000", "", 3, 0)],
        );

        assert!(diff.passed);
    }

    #[test]
    fn test_excluded_dirs_are_skipped() {
        let mut files = files(&[("/t/vendor/a.go", "a.go", "x := 1 // [GO-W1000]\n")]);

        let diff = diff_checks(
            &mut files,
            &[PathBuf::from("/t/vendor")],
            &BTreeSet::new(),
            &[issue("/t/vendor/a.go", "GO-W1001", "", 1, 0)],
        );

        assert!(diff.passed);
        assert!(diff.files.is_empty());
    }

    #[test]
    fn test_file_name_code_restricts_checks() {
        let mut files = files(&[
            ("/t/PY-W1000.py", "PY-W1000.py", "x = 1  # [PY-W1000]\n"),
            ("/t/other.py", "other.py", "y = 2\n"),
        ]);
        let issues = vec![
            issue("/t/PY-W1000.py", "PY-W1000", "", 1, 0),
            issue("/t/PY-W1000.py", "PY-W1234", "", 1, 0),
            issue("/t/other.py", "PY-W1234", "", 1, 0),
        ];

        let diff = run(&mut files, &issues);

        let named = &files[Path::new("/t/PY-W1000.py")];
        assert_eq!(named.check_mode, CheckMode::CheckInclude);
        assert_eq!(named.issue_codes, vec!["PY-W1000"]);

        assert!(!diff.passed);
        assert!(!diff.files.contains_key(Path::new("/t/PY-W1000.py")));
        assert_eq!(diff.files[Path::new("/t/other.py")].unexpected, vec![issues[2].clone()]);
    }

    #[test]
    fn test_file_name_code_needs_reported_code() {
        let mut files = files(&[("/t/PY-W1000.py", "PY-W1000.py", "x = 1\n")]);
        match_file_name_issue_codes(&mut files, &[issue("/t/x.py", "PY-W1001", "", 1, 0)]);

        assert_eq!(files[Path::new("/t/PY-W1000.py")].check_mode, CheckMode::CheckAll);
    }

    #[test]
    fn test_directive_beats_file_name() {
        let mut files = files(&[(
            "/t/PY-W1000.py",
            "PY-W1000.py",
            "# scatr-ignore: PY-W1001\nx = 1\n",
        )]);
        match_file_name_issue_codes(&mut files, &[issue("/t/x.py", "PY-W1000", "", 1, 0)]);

        let file = &files[Path::new("/t/PY-W1000.py")];
        assert_eq!(file.check_mode, CheckMode::CheckExclude);
        assert_eq!(file.issue_codes, vec!["PY-W1001"]);
    }

    #[test]
    fn test_ignore_directive_silences_codes() {
        let content = "# scatr-ignore: PY-W1000, PY-S1024\nx = 1  # [PY-W1000]: 3\ny = 2  # [PY-S1024]\n";
        let mut files = files(&[("/t/a.py", "a.py", content)]);

        let diff = run(
            &mut files,
            &[
                issue("/t/a.py", "PY-W1000", "", 2, 9),
                issue("/t/a.py", "PY-S1024", "", 5, 0),
                issue("/t/a.py", "PY-W1000", "", 3, 0),
            ],
        );

        assert!(diff.passed, "{diff:?}");
    }

    #[test]
    fn test_check_directive_limits_reporting() {
        let content = "// scatr-check: GO-W1000\nx := 1\n";
        let mut files = files(&[("/t/a.go", "a.go", content)]);
        let reported = issue("/t/a.go", "GO-W1000", "", 2, 0);

        let diff = run(
            &mut files,
            &[reported.clone(), issue("/t/a.go", "GO-W1001", "", 2, 0)],
        );

        assert_eq!(diff.files[Path::new("/t/a.go")].unexpected, vec![reported]);
    }

    #[test]
    fn test_reconciliation_is_repeatable_on_fresh_copies() {
        let content = "x := 1 // [GO-W1000]: 4 \"Hello\"; [GO-W1001]\n// [GO-W1002]\ny := 2\n";
        let pristine = files(&[("/t/a.go", "a.go", content)]);
        let issues = vec![
            issue("/t/a.go", "GO-W1000", "Hello", 1, 4),
            issue("/t/a.go", "GO-W1003", "", 3, 0),
        ];

        let first = run(&mut pristine.clone(), &issues);
        let second = run(&mut pristine.clone(), &issues);

        assert_eq!(first, second);
        assert_eq!(first.counts(), (1, 2));
    }

    #[test]
    fn test_should_report_without_file() {
        assert!(should_report(None, "GO-W1000"));
    }

    #[test]
    fn test_is_excluded_by_component() {
        let dirs = vec![PathBuf::from("/t/vendor")];

        assert!(is_excluded(Path::new("/t/vendor/a.go"), &dirs));
        assert!(!is_excluded(Path::new("/t/vendored/a.go"), &dirs));
    }
}

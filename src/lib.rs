//! @ai:module:intent SCATR library: verify static analyzer output against annotated fixture files
//! @ai:module:layer infrastructure
//! @ai:module:public_api annotation, parser, extractor, result, diff, config, files, script, autofix, marvin, output, runner, error
//!
//! # SCATR
//!
//! Fixture files carry comments such as `// [GO-W1000]: 4 "message"` that say
//! which issues an analyzer must report on which line. SCATR runs the analyzer,
//! reads its result and reports every unexpected issue and every expected issue
//! that was not raised.
//!
//! ## Example
//!
//! ```rust
//! use scatr::{diff_checks, Issue, PragmaFile, PragmaFiles};
//! use std::collections::BTreeSet;
//! use std::path::PathBuf;
//!
//! let prefixes = vec!["//".to_string()];
//! let file = PragmaFile::new("main.go", "x := 1 // [GO-W1000]\n", &prefixes);
//!
//! let mut files = PragmaFiles::new();
//! files.insert(PathBuf::from("/code/main.go"), file);
//!
//! let issues = vec![Issue::new("GO-W1000", "", 1, 0).with_normalized_file("/code/main.go")];
//! let diff = diff_checks(&mut files, &[], &BTreeSet::new(), &issues);
//! assert!(diff.passed);
//! ```

pub mod annotation;
pub mod autofix;
pub mod config;
pub mod diff;
pub mod error;
pub mod extractor;
pub mod files;
pub mod marvin;
pub mod output;
pub mod parser;
pub mod result;
pub mod runner;
pub mod script;

pub use annotation::{is_issue_code, CheckMode, Detail, Pragma};
pub use autofix::{AutofixReport, GoldenMismatch};
pub use config::{Config, ProcessorConfig, TestRunnerConfig};
pub use diff::{diff_checks, match_file_name_issue_codes, should_report, ChecksDiff, IssuesForFile, PragmaFiles};
pub use error::{Error, Result};
pub use extractor::PragmaFile;
pub use output::{format_run_report, OutputFormat};
pub use parser::{parse_pragma, PragmaParser};
pub use result::{AnalysisResult, Issue, IssuePosition, Location};
pub use runner::{RunOptions, RunReport, Runner};

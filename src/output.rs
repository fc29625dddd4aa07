//! @ai:module:intent Render run reports as plain text, aligned colored text or JSON
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_run_report, format_checks_diff, format_autofix_report
//! @ai:module:depends_on runner, diff, autofix, result
//! @ai:module:stateless true

use crate::autofix::AutofixReport;
use crate::diff::ChecksDiff;
use crate::result::Issue;
use crate::runner::RunReport;
use colored::Colorize;
use std::fmt::Write;
use std::path::Path;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Unexpected,
    NotRaised,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::Unexpected => "Unexpected Issue",
            Kind::NotRaised => "Issue not raised",
        }
    }
}

/// @ai:intent Render a whole run report
/// @ai:pre cwd is the directory paths are shown relative to in pretty mode
/// @ai:effects pure
pub fn format_run_report(report: &RunReport, format: OutputFormat, cwd: &Path) -> String {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(report).unwrap_or_default();
    }

    let mut output = String::new();

    for warning in &report.warnings {
        let _ = writeln!(output, "{} {}", "Warn:".yellow().bold(), warning);
    }

    if let Some(checks) = &report.checks {
        if format == OutputFormat::Pretty {
            let _ = writeln!(output, "{}", "Checks".yellow().bold().underline());
        }
        output.push_str(&format_checks_diff(checks, format, cwd));
    }

    if let Some(autofix) = &report.autofix {
        if format == OutputFormat::Pretty {
            let _ = writeln!(output, "{}", "Autofix".yellow().bold().underline());
        }
        output.push_str(&format_autofix_report(autofix, format, cwd));
    }

    if format == OutputFormat::Pretty {
        let status = if report.passed {
            " PASSED ".black().on_green().bold()
        } else {
            " FAILED ".white().on_red().bold()
        };
        let _ = writeln!(output, "\n{status}");
    }

    output
}

/// @ai:intent Render unexpected and not-raised diagnostics
/// @ai:effects pure
pub fn format_checks_diff(diff: &ChecksDiff, format: OutputFormat, cwd: &Path) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(diff).unwrap_or_default(),
        OutputFormat::Plain => {
            let mut output = String::new();
            for (path, issues) in &diff.files {
                for issue in &issues.unexpected {
                    plain_issue(&mut output, path, issue, Kind::Unexpected);
                }
                for issue in &issues.not_raised {
                    plain_issue(&mut output, path, issue, Kind::NotRaised);
                }
            }
            output
        }
        OutputFormat::Pretty => {
            let mut output = String::new();
            for (path, issues) in &diff.files {
                let _ = writeln!(output, "{}", format!("# {}", relative(path, cwd)).red().bold());
                for issue in &issues.unexpected {
                    pretty_issue(&mut output, issue, Kind::Unexpected);
                }
                for issue in &issues.not_raised {
                    pretty_issue(&mut output, issue, Kind::NotRaised);
                }
                output.push('\n');
            }
            output
        }
    }
}

/// @ai:intent Render identical-golden and golden-mismatch findings
/// @ai:effects pure
pub fn format_autofix_report(report: &AutofixReport, format: OutputFormat, cwd: &Path) -> String {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(report).unwrap_or_default();
    }

    let mut output = String::new();
    let pretty = format == OutputFormat::Pretty;

    for file in &report.identical {
        let file = display_path(file, cwd, pretty);
        let _ = writeln!(output, "{}: file is identical to its golden file", file);
    }

    for mismatch in &report.mismatches {
        let file = display_path(&mismatch.file, cwd, pretty);
        let golden = display_path(&mismatch.golden, cwd, pretty);

        if pretty {
            let _ = writeln!(
                output,
                "{} {} differs from {}",
                "#".red().bold(),
                file.bold(),
                golden
            );
            for line in mismatch.diff.lines() {
                let line = if line.starts_with("+++") || line.starts_with("---") {
                    line.bold()
                } else if line.starts_with('+') {
                    line.green()
                } else if line.starts_with('-') {
                    line.red()
                } else if line.starts_with("@@") {
                    line.cyan()
                } else {
                    line.normal()
                };
                let _ = writeln!(output, "{line}");
            }
        } else {
            let _ = writeln!(output, "{}: autofix result differs from {}", file, golden);
            output.push_str(&mismatch.diff);
        }
    }

    output
}

fn plain_issue(output: &mut String, path: &Path, issue: &Issue, kind: Kind) {
    let location = if issue.column() > 0 {
        format!("{}:{}:{}", path.display(), issue.line(), issue.column())
    } else {
        format!("{}:{}", path.display(), issue.line())
    };

    let _ = writeln!(
        output,
        "{} {} {}: {:?}",
        location,
        kind.label(),
        issue.code,
        issue.title
    );
}

fn pretty_issue(output: &mut String, issue: &Issue, kind: Kind) {
    let line = issue.line().to_string();
    let mut indent = 14_isize - line.len() as isize;

    let mut position = format!("Line: {line}");
    if issue.column() > 0 {
        let column = issue.column().to_string();
        indent -= 7 + column.len() as isize;
        let _ = write!(position, ", Col: {column}");
    }

    let indent = if indent <= 0 { 2 } else { indent as usize };
    let after_code = match 18_isize - issue.code.len() as isize {
        n if n <= 0 => 2,
        n => n as usize,
    };

    let label = match kind {
        Kind::Unexpected => "Unexpected".red(),
        Kind::NotRaised => "Not raised".red(),
    };

    let _ = writeln!(
        output,
        "{}{}{}{}{}  {}",
        position.dimmed(),
        " ".repeat(indent),
        issue.code.bold(),
        " ".repeat(after_code),
        label,
        issue.title
    );
}

fn relative(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn display_path(path: &Path, cwd: &Path, pretty: bool) -> String {
    if pretty {
        relative(path, cwd)
    } else {
        path.display().to_string()
    }
}

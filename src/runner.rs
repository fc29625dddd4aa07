//! @ai:module:intent Orchestrate a full checks and autofix test run of one directory
//! @ai:module:layer application
//! @ai:module:public_api Runner, RunOptions, RunReport
//! @ai:module:depends_on config, files, script, diff, autofix, error

use crate::autofix::{test_autofix, AutofixReport};
use crate::config::{Config, CONFIG_FILE};
use crate::diff::{diff_checks, ChecksDiff};
use crate::error::{Error, Result};
use crate::files::{normalize_file_list, normalize_path, read_files, unmatched_files};
use crate::script::{run_processor, run_script};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// @ai:intent Inputs of a run, as given on the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory holding `.scatr.toml`; scripts run from here.
    pub cwd: PathBuf,
    /// Restrict the run to these files, relative to the code path.
    pub files: Vec<PathBuf>,
    /// Write autofixed copies here instead of fixing in place.
    pub autofix_dir: Option<PathBuf>,
}

/// @ai:intent Everything a run found out
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ChecksDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autofix: Option<AutofixReport>,
}

/// @ai:intent Runs the configured test stages for a directory
#[derive(Debug)]
pub struct Runner {
    root: PathBuf,
    config: Config,
    code_path: PathBuf,
}

impl Runner {
    /// @ai:intent Load the configuration of the run directory
    /// @ai:pre `<cwd>/.scatr.toml` exists
    /// @ai:effects fs:read
    pub fn new(cwd: &Path) -> Result<Self> {
        let root = normalize_path(cwd)?;
        let config = Config::load(&root.join(CONFIG_FILE))?;
        let code_path = normalize_path(&root.join(&config.code_path))?;

        debug!(root = %root.display(), code_path = %code_path.display(), "Loaded config");
        Ok(Self {
            root,
            config,
            code_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// @ai:intent One-shot convenience: load and run
    /// @ai:effects fs:read, fs:write, process:spawn
    pub fn run(options: &RunOptions) -> Result<RunReport> {
        Self::new(&options.cwd)?.execute(options)
    }

    /// @ai:intent Run every enabled stage
    /// @ai:post passed is true iff every enabled stage passed
    /// @ai:effects fs:read, fs:write, process:spawn
    pub fn execute(&self, options: &RunOptions) -> Result<RunReport> {
        if !self.config.test_checks && !self.config.test_autofix {
            return Err(Error::NothingToDo);
        }

        let included = normalize_file_list(&options.files, &self.code_path);
        let excluded = self.excluded_dirs();
        let mut report = RunReport {
            passed: true,
            ..Default::default()
        };

        if self.config.test_checks {
            let (diff, warnings) = self.test_checks(&excluded, &included)?;
            report.passed &= diff.passed;
            report.warnings = warnings;
            report.checks = Some(diff);
        }

        if self.config.test_autofix {
            let autofix_dir = match &options.autofix_dir {
                Some(dir) => {
                    let dir = self.root.join(dir);
                    std::fs::create_dir_all(&dir)?;
                    Some(normalize_path(&dir)?)
                }
                None => None,
            };

            let autofix = test_autofix(
                &self.config,
                &self.root,
                &self.code_path,
                &excluded,
                &included,
                autofix_dir.as_deref(),
            )?;
            report.passed &= autofix.passed;
            report.autofix = Some(autofix);
        }

        Ok(report)
    }

    fn excluded_dirs(&self) -> Vec<PathBuf> {
        self.config
            .excluded_dirs
            .iter()
            .map(|dir| {
                let joined = self.code_path.join(dir);
                normalize_path(&joined).unwrap_or(joined)
            })
            .collect()
    }

    fn test_checks(&self, excluded: &[PathBuf], included: &BTreeSet<PathBuf>) -> Result<(ChecksDiff, Vec<String>)> {
        info!(interpreter = %self.config.checks.interpreter, "Running the checks test script");
        let start = Instant::now();
        run_script(&self.config.checks, &self.root, &self.code_path, &[])?;
        info!(elapsed = ?start.elapsed(), "Checks script done");

        let output_file = self.root.join(&self.config.checks.output_file);
        info!(file = %output_file.display(), "Processing the analysis result");
        let result = run_processor(&self.config.processor, &self.root, &output_file, &self.code_path)?;

        let mut files = read_files(
            &self.code_path,
            &self.config.files_glob,
            &self.config.comment_prefix,
            included,
        )?;
        let warnings = unmatched_files(&result.issues, &files);

        let diff = diff_checks(&mut files, excluded, included, &result.issues);
        let (unexpected, not_raised) = diff.counts();
        info!(unexpected, not_raised, passed = diff.passed, "Checks compared");

        Ok((diff, warnings))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) {
        fs::write(dir.join(CONFIG_FILE), body).unwrap();
    }

    /// The "analyzer" copies a canned result into place.
    fn checks_fixture(result: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.py"),
            "x = 1  # [PY-W1000]\ny = 2\n# [PY-W1001]: 3 \"Hello\"\nz = 3\n",
        )
        .unwrap();
        fs::write(dir.path().join("canned.json"), result).unwrap();
        write_config(
            dir.path(),
            r##"
files = "*.py"
comment_prefix = ["#"]

[checks]
script = "cp canned.json result.json"
output_file = "result.json"

[processor]
skip_processing = true
"##,
        );
        dir
    }

    fn issue(code: &str, title: &str, line: usize, column: usize) -> String {
        format!(
            r#"{{"code": "{code}", "title": "{title}", "position": {{"file": "a.py", "start": {{"line": {line}, "column": {column}}}}}}}"#
        )
    }

    #[test]
    fn test_checks_pass() {
        let result = format!(
            r#"{{"issues": [{}, {}]}}"#,
            issue("PY-W1000", "", 1, 1),
            issue("PY-W1001", "Hello", 4, 3)
        );
        let dir = checks_fixture(&result);

        let report = Runner::run(&RunOptions {
            cwd: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        assert!(report.passed, "{report:?}");
        assert!(report.warnings.is_empty());
        assert!(report.autofix.is_none());
    }

    #[test]
    fn test_checks_fail_and_warn() {
        let result = format!(
            r#"{{"issues": [{}, {}, {}]}}"#,
            issue("PY-W1000", "", 1, 1),
            issue("PY-W1002", "", 2, 1),
            r#"{"code": "PY-W1000", "title": "", "position": {"file": "other.py", "start": {"line": 1, "column": 0}}}"#
        );
        let dir = checks_fixture(&result);

        let report = Runner::run(&RunOptions {
            cwd: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        assert!(!report.passed);
        let checks = report.checks.unwrap();
        // PY-W1002 and the stray file are unexpected, PY-W1001 was never raised.
        assert_eq!(checks.counts(), (2, 1));
        assert_eq!(
            report.warnings,
            vec!["\"other.py\" is present in the analysis result but is not checked by SCATR.".to_string()]
        );
    }

    #[test]
    fn test_nothing_to_do() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "files = \"*.py\"\n");

        let err = Runner::run(&RunOptions {
            cwd: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, Error::NothingToDo));
    }

    #[test]
    fn test_missing_config() {
        let dir = TempDir::new().unwrap();
        let err = Runner::new(dir.path()).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_autofix_stage() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1 \n").unwrap();
        fs::write(dir.path().join("a.py.golden"), "x = 1\n").unwrap();
        write_config(
            dir.path(),
            r#"
files = "*.py"

[autofix]
script = "sed 's/ $//' \"$OUTPUT_DIR/a.py\" > \"$OUTPUT_DIR/a.tmp\" && mv \"$OUTPUT_DIR/a.tmp\" \"$OUTPUT_DIR/a.py\""
"#,
        );

        let report = Runner::run(&RunOptions {
            cwd: dir.path().to_path_buf(),
            autofix_dir: Some(PathBuf::from("fixed")),
            ..Default::default()
        })
        .unwrap();

        assert!(report.passed, "{report:?}");
        assert!(report.checks.is_none());
        assert_eq!(fs::read_to_string(dir.path().join("fixed/a.py")).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(dir.path().join("a.py")).unwrap(), "x = 1 \n");
    }
}

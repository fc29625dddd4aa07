//! @ai:module:intent Test autofix scripts against `.golden` files with backup and restore
//! @ai:module:layer application
//! @ai:module:public_api AutofixBackup, AutofixReport, GoldenMismatch, test_autofix, unified_diff
//! @ai:module:depends_on config, files, script, diff, error

use crate::config::Config;
use crate::diff::is_excluded;
use crate::error::{Error, Result};
use crate::files::{discover_files, normalize_path};
use crate::script::run_script;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::Serialize;
use similar::TextDiff;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// @ai:intent Autofixed file that does not match its golden file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoldenMismatch {
    pub file: PathBuf,
    pub golden: PathBuf,
    /// Unified diff from the golden file to the autofixed file.
    pub diff: String,
}

/// @ai:intent Outcome of one autofix test run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutofixReport {
    pub passed: bool,
    /// Files already identical to their golden file before autofix ran.
    pub identical: Vec<PathBuf>,
    pub mismatches: Vec<GoldenMismatch>,
}

/// @ai:intent Copies of autofix candidates, either as a backup or as the autofix working set
/// @ai:invariant restore runs at most once
#[derive(Debug)]
pub struct AutofixBackup {
    code_path: PathBuf,
    /// Relative to the code path.
    copied_files: Vec<PathBuf>,
    backup_dir: Option<TempDir>,
    autofix_dir: Option<PathBuf>,
}

impl AutofixBackup {
    /// @ai:intent Copy every file matching the glob, minus gitignored ones
    /// @ai:pre code_path is normalized; autofix_dir, if any, exists
    /// @ai:post without autofix_dir the copies live in a temporary backup directory
    /// @ai:effects fs:read, fs:write
    pub fn create(
        config: &Config,
        code_path: &Path,
        included_files: &BTreeSet<PathBuf>,
        autofix_dir: Option<&Path>,
    ) -> Result<Self> {
        let gitignore = load_gitignore(code_path)?;

        let (backup_dir, target) = match autofix_dir {
            Some(dir) => (None, dir.to_path_buf()),
            None => {
                let dir = tempfile::Builder::new().prefix("autofix_backup").tempdir()?;
                let target = dir.path().to_path_buf();
                (Some(dir), target)
            }
        };

        let mut copied_files = Vec::new();
        for relative in discover_files(code_path, &config.files_glob)? {
            let source = code_path.join(&relative);

            if !included_files.is_empty() {
                match normalize_path(&source) {
                    Ok(normalized) if included_files.contains(&normalized) => {}
                    _ => continue,
                }
            }

            if gitignore.matched_path_or_any_parents(&source, false).is_ignore() {
                debug!(file = %relative.display(), "Ignored by .gitignore");
                continue;
            }

            let destination = target.join(&relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &destination)?;
            copied_files.push(relative);
        }

        debug!(count = copied_files.len(), target = %target.display(), "Copied autofix files");

        Ok(Self {
            code_path: code_path.to_path_buf(),
            copied_files,
            backup_dir,
            autofix_dir: autofix_dir.map(Path::to_path_buf),
        })
    }

    /// @ai:intent Whether the autofix script rewrites files inside the code path
    pub fn in_place(&self) -> bool {
        self.autofix_dir.is_none()
    }

    pub fn copied_files(&self) -> &[PathBuf] {
        &self.copied_files
    }

    /// @ai:intent Where the autofixed version of a copied file ends up
    pub fn fixed_path(&self, relative: &Path) -> PathBuf {
        match &self.autofix_dir {
            Some(dir) => dir.join(relative),
            None => self.code_path.join(relative),
        }
    }

    /// @ai:intent Put backed-up files back into the code path and drop the backup
    /// @ai:post a second call is a no-op
    /// @ai:effects fs:write
    pub fn restore(&mut self) -> Result<()> {
        let Some(backup_dir) = self.backup_dir.take() else {
            return Ok(());
        };

        for relative in &self.copied_files {
            fs::copy(backup_dir.path().join(relative), self.code_path.join(relative))?;
        }

        backup_dir.close()?;
        Ok(())
    }
}

fn load_gitignore(code_path: &Path) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(code_path);
    let path = code_path.join(".gitignore");

    if path.is_file() {
        // Valid patterns are kept even when some lines fail to parse.
        if let Some(e) = builder.add(&path) {
            warn!(file = %path.display(), error = %e, "Skipping invalid .gitignore patterns");
        }
    }

    Ok(builder.build()?)
}

fn golden_path(path: &Path) -> PathBuf {
    let mut golden = OsString::from(path.as_os_str());
    golden.push(".golden");
    PathBuf::from(golden)
}

/// @ai:intent Unified diff turning the golden text into the autofixed text
/// @ai:effects pure
pub fn unified_diff(expected: &str, actual: &str, golden_name: &str, fixed_name: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let rendered = diff
        .unified_diff()
        .context_radius(3)
        .header(golden_name, fixed_name)
        .to_string();
    rendered
}

/// @ai:intent Input files that already equal their golden file
/// @ai:effects fs:read
fn identical_golden_files(backup: &AutofixBackup, excluded_dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut identical = Vec::new();

    for relative in backup.copied_files() {
        let path = backup.code_path.join(relative);
        if is_excluded(&path, excluded_dirs) {
            continue;
        }

        let golden = golden_path(&path);
        if !golden.is_file() {
            continue;
        }

        if fs::read(&path)? == fs::read(&golden)? {
            identical.push(path);
        }
    }

    Ok(identical)
}

/// @ai:intent Compare every autofixed file with its golden file
/// @ai:effects fs:read
fn verify_golden_files(backup: &AutofixBackup, excluded_dirs: &[PathBuf]) -> Result<Vec<GoldenMismatch>> {
    let mut mismatches = Vec::new();

    for relative in backup.copied_files() {
        let original = backup.code_path.join(relative);
        if is_excluded(&original, excluded_dirs) {
            continue;
        }

        let golden = golden_path(&original);
        if !golden.is_file() {
            continue;
        }

        let fixed = backup.fixed_path(relative);
        let actual = fs::read(&fixed)?;
        let expected = fs::read(&golden)?;
        if actual == expected {
            debug!(file = %relative.display(), "Autofix matches golden file");
            continue;
        }

        let diff = unified_diff(
            &String::from_utf8_lossy(&expected),
            &String::from_utf8_lossy(&actual),
            &golden.display().to_string(),
            &fixed.display().to_string(),
        );

        mismatches.push(GoldenMismatch {
            file: fixed,
            golden,
            diff,
        });
    }

    Ok(mismatches)
}

fn run_autofix(
    config: &Config,
    root: &Path,
    backup: &AutofixBackup,
    excluded_dirs: &[PathBuf],
) -> Result<AutofixReport> {
    let identical = identical_golden_files(backup, excluded_dirs)?;
    for file in &identical {
        warn!(file = %file.display(), "File is identical to its golden file");
    }

    let output_dir = backup
        .autofix_dir
        .clone()
        .unwrap_or_else(|| root.to_path_buf());

    info!(interpreter = %config.autofix.interpreter, "Running the autofix test script");
    run_script(
        &config.autofix,
        root,
        &backup.code_path,
        &[("OUTPUT_DIR", output_dir.as_os_str())],
    )?;

    info!("Verifying autofixed files against golden files");
    let mismatches = verify_golden_files(backup, excluded_dirs)?;

    Ok(AutofixReport {
        passed: identical.is_empty() && mismatches.is_empty(),
        identical,
        mismatches,
    })
}

/// @ai:intent Back up, run the autofix script, compare with golden files and restore
/// @ai:pre code_path is normalized; autofix_dir, if any, is normalized and exists
/// @ai:post in-place runs leave the code path as they found it, even on failure
/// @ai:effects fs:read, fs:write, process:spawn
pub fn test_autofix(
    config: &Config,
    root: &Path,
    code_path: &Path,
    excluded_dirs: &[PathBuf],
    included_files: &BTreeSet<PathBuf>,
    autofix_dir: Option<&Path>,
) -> Result<AutofixReport> {
    info!("Backing up the potentially autofixable files");
    let mut backup = AutofixBackup::create(config, code_path, included_files, autofix_dir)?;

    let outcome = run_autofix(config, root, &backup, excluded_dirs);
    let restored = backup.restore();

    match (outcome, restored) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(run), Err(restore)) => Err(Error::Restore {
            run: Box::new(run),
            restore: Box::new(restore),
        }),
    }
}

//! @ai:module:intent Discover fixture files and build their annotation indexes
//! @ai:module:layer infrastructure
//! @ai:module:public_api normalize_path, normalize_file_list, discover_files, read_files, unmatched_files
//! @ai:module:depends_on extractor, parser, diff, result, error

use crate::diff::PragmaFiles;
use crate::error::{Error, Result};
use crate::extractor::PragmaFile;
use crate::parser::PragmaParser;
use crate::result::Issue;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// `*` stays within one path component, `**` spans directories.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// @ai:intent Absolute, symlink-resolved form of a path
/// @ai:pre path exists
/// @ai:effects fs:read
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| Error::Normalize {
        path: path.to_path_buf(),
        source: e,
    })
}

/// @ai:intent Normalize user-supplied file paths relative to the code path
/// @ai:post paths that cannot be normalized are logged and dropped
/// @ai:effects fs:read
pub fn normalize_file_list(files: &[PathBuf], code_path: &Path) -> BTreeSet<PathBuf> {
    files
        .iter()
        .filter_map(|file| match normalize_path(&code_path.join(file)) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Skipping included file");
                None
            }
        })
        .collect()
}

/// @ai:intent List files under the code path matching the glob, relative to the code path
/// @ai:post result is sorted for deterministic processing
/// @ai:effects fs:read
pub fn discover_files(code_path: &Path, files_glob: &str) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(files_glob)?;

    let mut found: Vec<PathBuf> = WalkDir::new(code_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(code_path)
                .ok()
                .map(Path::to_path_buf)
        })
        .filter(|relative| pattern.matches_path_with(relative, GLOB_OPTIONS))
        .collect();

    found.sort();
    Ok(found)
}

/// @ai:intent Read one fixture file into its annotation index
/// @ai:effects fs:read
pub fn load_pragma_file(parser: &PragmaParser, path: &Path, comment_prefix: &[String]) -> Result<PragmaFile> {
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    Ok(PragmaFile::with_parser(parser, &name, &content, comment_prefix))
}

/// @ai:intent Build annotation indexes for every fixture file under test
/// @ai:pre code_path is normalized
/// @ai:post keys are normalized absolute paths
/// @ai:effects fs:read
pub fn read_files(
    code_path: &Path,
    files_glob: &str,
    comment_prefix: &[String],
    included_files: &BTreeSet<PathBuf>,
) -> Result<PragmaFiles> {
    let parser = PragmaParser::new();
    let mut files = PragmaFiles::new();

    let candidates: Vec<PathBuf> = if included_files.is_empty() {
        discover_files(code_path, files_glob)?
            .into_iter()
            .map(|relative| code_path.join(relative))
            .collect()
    } else {
        let pattern = Pattern::new(files_glob)?;
        included_files
            .iter()
            .filter(|path| {
                path.strip_prefix(code_path)
                    .map(|relative| pattern.matches_path_with(relative, GLOB_OPTIONS))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    };

    for path in candidates {
        let normalized = match normalize_path(&path) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(error = %e, "Skipping fixture file");
                continue;
            }
        };

        let file = load_pragma_file(&parser, &normalized, comment_prefix)?;
        debug!(
            file = %normalized.display(),
            pragmas = file.pragmas.len(),
            mode = %file.check_mode,
            "Extracted pragmas"
        );
        files.insert(normalized, file);
    }

    Ok(files)
}

/// @ai:intent Warnings for issue files that no fixture file accounts for
/// @ai:post each file is reported once, in first-seen order
/// @ai:effects pure
pub fn unmatched_files(issues: &[Issue], files: &PragmaFiles) -> Vec<String> {
    let mut seen = BTreeSet::new();

    issues
        .iter()
        .filter(|issue| !files.contains_key(issue.normalized_file()))
        .filter(|issue| seen.insert(issue.position.file.clone()))
        .map(|issue| {
            format!(
                "{:?} is present in the analysis result but is not checked by SCATR.",
                issue.position.file
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::CheckMode;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn prefixes() -> Vec<String> {
        vec!["#".to_string()]
    }

    fn fixture_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("a.py"), "x = 1  # [PY-W1000]\n").unwrap();
        fs::write(dir.path().join("nested/b.py"), "# [PY-W1001]: 2\ny = 2\n").unwrap();
        fs::write(dir.path().join("nested/deeper/c.py"), "z = 3\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "# [PY-W1000]\n").unwrap();
        dir
    }

    #[test]
    fn test_discover_single_star_stays_in_directory() {
        let dir = fixture_dir();
        let found = discover_files(dir.path(), "*.py").unwrap();
        assert_eq!(found, vec![PathBuf::from("a.py")]);
    }

    #[test]
    fn test_discover_double_star_recurses() {
        let dir = fixture_dir();
        let found = discover_files(dir.path(), "**/*.py").unwrap();

        assert_eq!(
            found,
            vec![
                PathBuf::from("a.py"),
                PathBuf::from("nested/b.py"),
                PathBuf::from("nested/deeper/c.py"),
            ]
        );
    }

    #[test]
    fn test_invalid_glob() {
        let dir = fixture_dir();
        assert!(matches!(discover_files(dir.path(), "[").unwrap_err(), Error::Glob(_)));
    }

    #[test]
    fn test_read_files_builds_indexes() {
        let dir = fixture_dir();
        let root = normalize_path(dir.path()).unwrap();

        let files = read_files(&root, "**/*.py", &prefixes(), &BTreeSet::new()).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files[&root.join("a.py")].pragmas[&1].has_code("PY-W1000"));
        assert_eq!(files[&root.join("nested/b.py")].pragmas[&2].issues["PY-W1001"][0].column, 2);
        assert!(files[&root.join("nested/deeper/c.py")].pragmas.is_empty());
        assert_eq!(files[&root.join("a.py")].check_mode, CheckMode::CheckAll);
    }

    #[test]
    fn test_read_files_limited_to_included() {
        let dir = fixture_dir();
        let root = normalize_path(dir.path()).unwrap();
        let included = normalize_file_list(
            &[PathBuf::from("nested/b.py"), PathBuf::from("notes.txt"), PathBuf::from("gone.py")],
            &root,
        );

        assert_eq!(included.len(), 2);

        let files = read_files(&root, "**/*.py", &prefixes(), &included).unwrap();
        assert_eq!(files.keys().cloned().collect::<Vec<_>>(), vec![root.join("nested/b.py")]);
    }

    #[test]
    fn test_unmatched_files_warns_once_per_file() {
        let dir = fixture_dir();
        let root = normalize_path(dir.path()).unwrap();
        let files = read_files(&root, "*.py", &prefixes(), &BTreeSet::new()).unwrap();

        let mut stray = Issue::new("PY-W1000", "", 1, 0).with_normalized_file(root.join("other.py"));
        stray.position.file = "other.py".to_string();
        let known = Issue::new("PY-W1000", "", 1, 0).with_normalized_file(root.join("a.py"));

        let warnings = unmatched_files(&[stray.clone(), known, stray], &files);
        assert_eq!(
            warnings,
            vec!["\"other.py\" is present in the analysis result but is not checked by SCATR.".to_string()]
        );
    }
}

//! @ai:module:intent Define reported issues and ingest an analyzer's result
//! @ai:module:layer domain
//! @ai:module:public_api AnalysisResult, Issue, IssuePosition, Location
//! @ai:module:depends_on files, error

use crate::error::Result;
use crate::files::normalize_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// @ai:intent Line/column pair; column 0 means unknown
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    #[serde(default)]
    pub column: usize,
}

/// @ai:intent Where an issue was reported
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuePosition {
    pub file: String,
    pub start: Location,
    #[serde(default)]
    pub end: Option<Location>,

    /// Absolute, symlink-resolved path used as the matching key.
    #[serde(skip)]
    pub(crate) normalized: PathBuf,
}

/// @ai:intent One analyzer finding, or one diagnostic derived from a pragma
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub code: String,
    #[serde(default)]
    pub title: String,
    pub position: IssuePosition,
}

impl Issue {
    pub fn new(code: impl Into<String>, title: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            position: IssuePosition {
                start: Location { line, column },
                ..Default::default()
            },
        }
    }

    /// @ai:intent Attach the normalized path used to match this issue against fixture files
    pub fn with_normalized_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.position.normalized = path.into();
        self
    }

    pub fn normalized_file(&self) -> &Path {
        &self.position.normalized
    }

    pub fn line(&self) -> usize {
        self.position.start.line
    }

    pub fn column(&self) -> usize {
        self.position.start.column
    }
}

/// @ai:intent Output of the result processor: `{"issues": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl AnalysisResult {
    /// @ai:intent Decode processor output and normalize every issue path against the code path
    /// @ai:post each issue carries an absolute normalized path
    /// @ai:effects fs:read
    pub fn from_json(bytes: &[u8], code_path: &Path) -> Result<Self> {
        let mut result: AnalysisResult = serde_json::from_slice(bytes)?;

        for issue in &mut result.issues {
            let joined = code_path.join(&issue.position.file);
            issue.position.normalized = match normalize_path(&joined) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(file = %issue.position.file, error = %e, "Error normalizing issue file path");
                    std::path::absolute(&joined).unwrap_or(joined)
                }
            };
        }

        Ok(result)
    }
}

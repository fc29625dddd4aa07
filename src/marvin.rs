//! @ai:module:intent Convert a marvin-style analyzer report into the reported-issue format
//! @ai:module:layer infrastructure
//! @ai:module:public_api MarvinResult, MarvinIssue, MarvinLocation, process_marvin_result
//! @ai:module:depends_on result, error

use crate::error::{Error, Result};
use crate::result::{AnalysisResult, Issue, IssuePosition, Location};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarvinPoint {
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub column: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarvinSpan {
    #[serde(default)]
    pub begin: MarvinPoint,
    #[serde(default)]
    pub end: MarvinPoint,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarvinLocation {
    pub path: String,
    #[serde(default)]
    pub position: MarvinSpan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarvinIssue {
    pub issue_code: String,
    #[serde(default)]
    pub issue_text: String,
    pub location: MarvinLocation,
}

/// @ai:intent Top-level marvin report
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarvinResult {
    #[serde(default)]
    pub issues: Vec<MarvinIssue>,
}

impl From<MarvinIssue> for Issue {
    fn from(issue: MarvinIssue) -> Self {
        let span = issue.location.position;

        Issue {
            code: issue.issue_code,
            title: issue.issue_text,
            position: IssuePosition {
                file: issue.location.path,
                start: Location {
                    line: span.begin.line,
                    column: span.begin.column,
                },
                end: Some(Location {
                    line: span.end.line,
                    column: span.end.column,
                }),
                ..Default::default()
            },
        }
    }
}

impl From<MarvinResult> for AnalysisResult {
    fn from(result: MarvinResult) -> Self {
        AnalysisResult {
            issues: result.issues.into_iter().map(Issue::from).collect(),
        }
    }
}

/// @ai:intent Read a marvin report and convert it
/// @ai:pre `.mpack` files hold MessagePack, anything else JSON
/// @ai:effects fs:read
pub fn process_marvin_result(input: &Path) -> Result<AnalysisResult> {
    let bytes = std::fs::read(input).map_err(|e| Error::FileRead {
        path: input.to_path_buf(),
        source: e,
    })?;

    let result: MarvinResult = if input.extension().is_some_and(|ext| ext == "mpack") {
        debug!(file = %input.display(), "MessagePack result detected");
        rmp_serde::from_slice(&bytes)?
    } else {
        debug!(file = %input.display(), "JSON result detected");
        serde_json::from_slice(&bytes)?
    };

    Ok(result.into())
}

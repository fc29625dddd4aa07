//! @ai:module:intent Load and resolve the `.scatr.toml` test configuration
//! @ai:module:layer infrastructure
//! @ai:module:public_api Config, TestRunnerConfig, ProcessorConfig, CONFIG_FILE
//! @ai:module:stateless true

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the run directory.
pub const CONFIG_FILE: &str = ".scatr.toml";

/// @ai:intent Fully resolved configuration of one test directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub files_glob: String,
    pub comment_prefix: Vec<String>,
    pub code_path: PathBuf,
    pub excluded_dirs: Vec<PathBuf>,
    pub checks: TestRunnerConfig,
    pub autofix: TestRunnerConfig,
    pub processor: ProcessorConfig,
    pub test_checks: bool,
    pub test_autofix: bool,
}

/// @ai:intent How to run the checks or autofix script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunnerConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub output_file: PathBuf,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub args: Vec<String>,
}

/// @ai:intent How to turn the analyzer output into the issues JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub skip_processing: bool,
}

/// On-disk shape, before presence-dependent defaults are applied.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    files: String,
    #[serde(default)]
    comment_prefix: Vec<String>,
    #[serde(default)]
    code_path: Option<String>,
    #[serde(default)]
    excluded_dirs: Vec<PathBuf>,
    checks: Option<TestRunnerConfig>,
    autofix: Option<TestRunnerConfig>,
    processor: Option<ProcessorConfig>,
    test_checks: Option<bool>,
    test_autofix: Option<bool>,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: String::new(),
            output_file: PathBuf::new(),
            interactive: false,
            args: Vec::new(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: String::new(),
            skip_processing: false,
        }
    }
}

fn default_interpreter() -> String {
    "sh".to_string()
}

fn interpreter_or_default(interpreter: String) -> String {
    if interpreter.trim().is_empty() {
        default_interpreter()
    } else {
        interpreter
    }
}

impl Config {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// @ai:intent Parse configuration text and apply defaults
    /// @ai:post test_checks defaults to whether [checks] is present, same for autofix
    /// @ai:effects pure
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(content)?;

        let test_checks = raw.test_checks.unwrap_or(raw.checks.is_some());
        let test_autofix = raw.test_autofix.unwrap_or(raw.autofix.is_some());

        let mut checks = raw.checks.unwrap_or_default();
        checks.interpreter = interpreter_or_default(checks.interpreter);

        let mut autofix = raw.autofix.unwrap_or_default();
        autofix.interpreter = interpreter_or_default(autofix.interpreter);

        let mut processor = raw.processor.unwrap_or_default();
        processor.interpreter = interpreter_or_default(processor.interpreter);

        let code_path = match raw.code_path {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            files_glob: raw.files,
            comment_prefix: raw.comment_prefix,
            code_path,
            excluded_dirs: raw.excluded_dirs,
            checks,
            autofix,
            processor,
            test_checks,
            test_autofix,
        })
    }
}

//! @ai:module:intent Define error types for the SCATR runner
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// @ai:intent Unified error type for all I/O facing runner operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to normalize path {path}: {source}")]
    Normalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid files glob: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid .gitignore: {0}")]
    Gitignore(#[from] ignore::Error),

    #[error("Script run with {interpreter:?} failed: {status}")]
    Script {
        interpreter: String,
        status: ExitStatus,
    },

    #[error("MessagePack decode error: {0}")]
    Msgpack(#[from] rmp_serde::decode::Error),

    #[error("Autofix error: {run}, restore error: {restore}")]
    Restore { run: Box<Error>, restore: Box<Error> },

    #[error("{0} not set")]
    MissingEnv(&'static str),

    #[error("nothing to do: neither checks nor autofix are enabled")]
    NothingToDo,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

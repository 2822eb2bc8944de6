use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::task::TaskKind;

pub type Result<T> = std::result::Result<T, MrError>;

/// Errors raised while executing tasks or preparing a job.
#[derive(Error, Debug)]
pub enum MrError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reducer needs an intermediate file no mapper has published yet.
    #[error("intermediate file missing: {}", .0.display())]
    MissingIntermediate(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown application '{0}'")]
    UnknownApp(String),

    /// The user supplied Map or Reduce function returned an error.
    #[error("{kind} callback failed: {message}")]
    Callback { kind: TaskKind, message: String },
}

impl MrError {
    pub fn callback(kind: TaskKind, err: anyhow::Error) -> Self {
        MrError::Callback {
            kind,
            message: format!("{err:#}"),
        }
    }
}

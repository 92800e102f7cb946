//! Fatal outcomes the CLI can exit on, and the process exit code each maps
//! to: I/O and malformed input are recoverable-by-the-operator (1), bad
//! configuration and a broken input-ordering contract are not (2).

use thiserror::Error;

use segmenter_core::{ConfigError, SegmenterError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Segmenter(#[from] SegmenterError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Io(_) | CliError::Malformed { .. } => 1,
            CliError::Config(_) | CliError::Segmenter(_) => 2,
        }
    }
}

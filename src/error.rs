use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("cannot open source {}: {source}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no .vm sources found in {}", .0.display())]
    NoSources(PathBuf),

    #[error("{unit}:{line}: malformed command `{text}`: {reason}")]
    MalformedCommand {
        unit: String,
        line: usize,
        text: String,
        reason: String,
    },

    #[error("{unit}:{line}: unknown segment `{segment}`")]
    UnknownSegment {
        unit: String,
        line: usize,
        segment: String,
    },

    #[error("unknown arithmetic operation `{op}`")]
    UnknownArithmeticOp { op: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TranslateError>;

use std::path::PathBuf;

/// Errors raised while decoding alignments or reading junction inputs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed CIGAR: {0}")]
    MalformedCigar(String),

    #[error("alignment file is not indexed: {} (expected a .bai or .csi next to it)", .0.display())]
    UnindexedInput(PathBuf),

    #[error("malformed line {line_no} in {}: {reason}: {line:?}", .path.display())]
    MalformedTargetLine {
        path: PathBuf,
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("invalid chromosome order: {0}")]
    Config(String),

    #[error("I/O error: {source} ({})", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl Error {
    /// Wrap an `io::Error` with the path it happened on.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn line(
        path: impl Into<PathBuf>,
        line_no: usize,
        line: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedTargetLine {
            path: path.into(),
            line_no,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

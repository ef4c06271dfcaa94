//! Error type shared by all phases of a mapreduce stage and by pipelines.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MRError>;

#[derive(Debug, Error)]
pub enum MRError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cannot open {}: {}", .path.display(), .source)]
    Open { path: PathBuf, source: io::Error },
    #[error("malformed record {record:?}: {reason}")]
    Parse { record: String, reason: String },
    #[error("stage {index} ({name}) failed: {source}")]
    Stage {
        index: usize,
        name: String,
        source: Box<MRError>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MRError {
    pub fn parse<R: Into<String>, S: Into<String>>(record: R, reason: S) -> MRError {
        MRError::Parse {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by how a job was set up rather than by the data it read.
    pub fn is_config(&self) -> bool {
        match self {
            MRError::Config(_) | MRError::Open { .. } => true,
            MRError::Stage { source, .. } => source.is_config(),
            _ => false,
        }
    }
}

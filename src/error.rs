use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal errors of a run. Any of them aborts before output is written.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot split {path} into line-aligned ranges: {source}")]
    Split {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker for range {range} failed to read its bytes: {source}")]
    WorkerRead {
        range: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker for range {range} produced a result that cannot be framed: {source}")]
    Encode {
        range: usize,
        #[source]
        source: FrameError,
    },

    #[error("frame from worker for range {range} is malformed: {source}")]
    Decode {
        range: usize,
        #[source]
        source: FrameError,
    },

    #[error("worker for range {range} exited without producing a frame")]
    WorkerAbnormalExit { range: usize },

    #[error("cannot write output to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Range index of the worker that failed, if the failure belongs to one.
    pub fn range(&self) -> Option<usize> {
        match self {
            Error::WorkerRead { range, .. }
            | Error::Encode { range, .. }
            | Error::Decode { range, .. }
            | Error::WorkerAbnormalExit { range } => Some(*range),
            Error::Split { .. } | Error::Output { .. } => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated: need {need} bytes at offset {offset}, have {have}")]
    Truncated {
        need: usize,
        offset: usize,
        have: usize,
    },

    #[error("{extra} unexpected bytes after the count matrix")]
    TrailingBytes { extra: usize },

    #[error("{what} does not fit in a u32 field")]
    TooLarge { what: &'static str },
}

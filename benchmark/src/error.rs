use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{engine}: protocol error: {reason}")]
    Protocol { engine: String, reason: String },

    #[error("{engine}: no reply within {limit:?}, process killed")]
    Timeout { engine: String, limit: Duration },

    #[error("{engine}: process exited unexpectedly")]
    Crashed { engine: String },

    #[error("{engine}: i/o error: {source}")]
    Io {
        engine: String,
        #[source]
        source: io::Error,
    },

    #[error("{engine}: invalid position: {source}")]
    InvalidPosition {
        engine: String,
        #[source]
        source: RulesError,
    },
}

impl EngineError {
    /// Whether the process behind the handle can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout { .. } | EngineError::Crashed { .. } | EngineError::Io { .. }
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("no accuracy cases found")]
    Empty,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("none of the {workers} workers could start their engines")]
    NoWorkersStarted { workers: usize },

    #[error("all workers exited with {remaining} items left in the queue")]
    WorkStranded { remaining: usize },
}

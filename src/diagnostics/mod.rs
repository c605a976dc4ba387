use crate::ir::{StatementKind, StmtId};
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the dispatch layer.
///
/// All of these are internal compiler errors: they mean a pass and the IR
/// schema disagree. Nothing in the dispatch layer recovers from them; they
/// propagate to the driver, which aborts compilation of the fusion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown node kind for statement {0}")]
    UnknownNodeKind(StmtId),

    #[error("Handle not overridden for {0}")]
    HandlerNotOverridden(StatementKind),

    #[error("Mutate not overridden for {0}")]
    MutatorNotOverridden(StatementKind),

    #[error("mutation produced {found} where {expected} was required")]
    KindMismatch {
        expected: &'static str,
        found: StatementKind,
    },

    #[error("expr {0} is not listed exactly once in the declared order")]
    ExprOrder(StmtId),
}

impl DispatchError {
    pub fn mismatch(expected: &'static str, found: StatementKind) -> Self {
        Self::KindMismatch { expected, found }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors surfaced by the `fuser` driver.
#[derive(Debug, Error)]
pub enum FuserError {
    #[error("internal compiler error: {0}")]
    Internal(#[from] DispatchError),

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fusion file {path}: {source}")]
    Fusion {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid fusion file {path}: {source}")]
    InvalidFusion {
        path: PathBuf,
        #[source]
        source: DispatchError,
    },

    #[error("identity rewrite changed the fusion ({detail})")]
    RoundTrip { detail: String },
}

impl FuserError {
    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn io(path: PathBuf, source: std::io::Error) -> Self {
        Self::Io { path, source }
    }
}

/// Render an error for the terminal.
pub fn render_error(err: &FuserError) -> String {
    match err {
        FuserError::Config { path, .. } => format!("error: {err}\n  --> {}", path.display()),
        _ => format!("error: {err}"),
    }
}

//! Error types for the ccprompt core library.

use std::path::PathBuf;

/// Top-level error enum for the ccprompt core library.
///
/// Only `UnsupportedLanguage` and `Grammar` ever leave the public entry
/// points; the per-file and per-symbol variants are logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum CcpromptError {
    #[error("'{name}' not found in the provided directories.")]
    NotFound { name: String },

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unreadable file {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Grammar error: {0}")]
    Grammar(String),
}

pub type CcpromptResult<T> = Result<T, CcpromptError>;

/// Why a front end refused a file. The file then contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax error at line {line}")]
    Syntax { line: usize },

    #[error("grammar rejected by parser: {0}")]
    Grammar(String),
}

impl ParseFailure {
    pub fn into_error(self, path: impl Into<PathBuf>) -> CcpromptError {
        CcpromptError::Parse {
            path: path.into(),
            message: self.to_string(),
        }
    }
}
